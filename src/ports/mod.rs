//! Ports (trait boundaries) for external collaborators.
//!
//! The simulation driver owns these traits; progress reporting and streaming
//! exports implement them as adapters in [`crate::observers`].

pub mod observer;

pub use observer::Observer;
