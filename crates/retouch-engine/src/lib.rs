//! # retouch-engine
//!
//! The layer stack and compositor of the retouch engine.
//!
//! - [`Layer`] / [`Context`] — the scene model: ordered, named layers
//!   with blend modes, opacity, masks, offsets, and per-layer adjustment
//!   stacks.
//! - [`Compositor`] — layer management, scaled-variant caching, the
//!   bottom-to-top render pipeline, and the single-pixel render entry
//!   point used by test harnesses.
//! - [`vector`] — the canonical flattening of a context's free
//!   parameters into a numeric vector plus a positional JSON key.
//! - [`trace`] — symbolic pixel traces: the identical pipeline replayed
//!   with the graph-building scalar for optimizer cost functions.
//!
//! Rendering is single-threaded and synchronous per call; parallelism
//! belongs to callers running independent renders on independent
//! [`Context`] clones (layers copy by value, pixel buffers share
//! copy-on-write).

#![warn(missing_docs)]

pub mod compositor;
pub mod context;
pub mod error;
pub mod layer;
mod pipeline;
pub mod trace;
pub mod vector;

pub use compositor::{Compositor, FULL_SIZE};
pub use context::Context;
pub use error::{EngineError, Result};
pub use layer::{AdjustmentType, BlendMode, Layer, ParamMap};
pub use trace::PixelTrace;
pub use vector::{
    context_to_vector, key_from_json, key_to_json, vector_to_context, ParamEntry, ParamKey,
    SelectiveColorRef,
};
