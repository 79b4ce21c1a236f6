// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BacktestError>;

/// Precondition failures of the signal generator and the simulator.
/// Every variant aborts the run before any output is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("price series has no '{0}' field")]
    MissingField(&'static str),

    #[error("misaligned input: expected {expected} entries, got {actual}")]
    MisalignedInput { expected: usize, actual: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
