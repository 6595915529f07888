//! Error types for the engine crate.

use thiserror::Error;

/// Result type alias using [`EngineError`] as the error type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by vectorization and trace building.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A parameter key referenced a layer the context does not contain.
    #[error("key references unknown layer '{0}'")]
    UnknownLayer(String),

    /// Key and value vector lengths disagree.
    #[error("key has {key_len} entries but vector has {vec_len}")]
    KeyVectorMismatch {
        /// Entries in the key.
        key_len: usize,
        /// Values in the vector.
        vec_len: usize,
    },

    /// A key entry could not be applied to its layer.
    #[error("key entry for layer '{layer}' has invalid shape: {reason}")]
    MalformedKeyEntry {
        /// Layer the entry targets.
        layer: String,
        /// What was wrong.
        reason: String,
    },

    /// The context has no image layer to size a render or trace against.
    #[error("context has no image layer")]
    EmptyContext,

    /// A pixel coordinate is outside the render bounds.
    #[error("pixel ({x}, {y}) out of bounds for {width}x{height}")]
    OutOfBounds {
        /// X coordinate.
        x: u32,
        /// Y coordinate.
        y: u32,
        /// Render width.
        width: u32,
        /// Render height.
        height: u32,
    },
}
