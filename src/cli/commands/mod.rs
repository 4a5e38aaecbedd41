//! CLI subcommands

pub mod design;
pub mod simulate;
