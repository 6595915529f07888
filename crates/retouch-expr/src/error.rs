//! Error types for expression trace evaluation.

use thiserror::Error;

/// Result type alias using [`ExprError`] as the error type.
pub type Result<T> = std::result::Result<T, ExprError>;

/// Errors that can occur while evaluating an expression trace.
#[derive(Debug, Error)]
pub enum ExprError {
    /// A parameter bank was shorter than the trace expects.
    #[error("{bank} parameter bank too short: trace expects {expected}, got {got}")]
    ParamCountMismatch {
        /// Which bank ("free" or "fixed").
        bank: &'static str,
        /// Parameters the trace expects.
        expected: usize,
        /// Parameters supplied.
        got: usize,
    },
}
