//! Error types for color utilities.

use thiserror::Error;

/// Result type alias using [`ColorError`] as the error type.
pub type Result<T> = std::result::Result<T, ColorError>;

/// Errors that can occur while building color utility objects.
#[derive(Debug, Error)]
pub enum ColorError {
    /// A curve needs at least two control points with distinct `x`.
    #[error("degenerate curve: need >= 2 control points with distinct x, got {0}")]
    DegenerateCurve(usize),

    /// A gradient needs at least one stop.
    #[error("degenerate gradient: no stops")]
    DegenerateGradient,
}
