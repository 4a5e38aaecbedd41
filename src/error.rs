//! Error types for the active inference engine

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("degenerate distribution: total mass {total} is not a usable normaliser")]
    DegenerateDistribution { total: f64 },

    #[error("degenerate distribution in row {row}: total mass {total} is not a usable normaliser")]
    DegenerateRow { row: usize, total: f64 },

    #[error("probability entry {index} is {value}, expected a finite non-negative number")]
    InvalidProbability { index: usize, value: f64 },

    #[error("no actions available to plan over")]
    NoActionsAvailable,

    #[error("planning diverged: all {candidates} candidate actions scored a non-finite free energy")]
    PlanningDiverged { candidates: usize },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("unknown {space} label '{label}'")]
    UnknownLabel { space: String, label: String },

    #[error("{what} has size {got}, expected {expected}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(what: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::DimensionMismatch {
            what: what.into(),
            expected,
            got,
        }
    }

    pub(crate) fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Whether the error is the locally recoverable "sum was ~0" case.
    pub fn is_degenerate(&self) -> bool {
        matches!(
            self,
            Error::DegenerateDistribution { .. } | Error::DegenerateRow { .. }
        )
    }
}

