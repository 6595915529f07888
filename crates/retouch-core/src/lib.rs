//! # retouch-core
//!
//! Core types for the retouch compositing engine.
//!
//! This crate provides the foundational [`Image`] buffer (flat row-major
//! RGBA8, copy-on-write) plus the error types shared across the workspace.
//! All higher-level crates (`retouch-color`, `retouch-ops`,
//! `retouch-engine`) build on these types:
//!
//! ```text
//! retouch-core (this crate)
//!    ^
//!    |
//!    +-- retouch-expr   (dual numeric/symbolic scalars)
//!    +-- retouch-color  (color space conversions, curves)
//!    +-- retouch-ops    (adjustment + blend catalog)
//!    +-- retouch-engine (layers, contexts, compositor)
//!    +-- retouch-io     (PNG boundary codec)
//! ```
//!
//! ## Feature flags
//!
//! - `parallel` (default) — row-parallel resampling via rayon.

#![warn(missing_docs)]

pub mod error;
pub mod image;

pub use error::{CoreError, Result};
pub use image::{luma, Image, ImageStats, LUMA_B, LUMA_G, LUMA_R};
