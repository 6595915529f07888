//! # retouch-expr
//!
//! Dual numeric/symbolic scalar evaluation.
//!
//! Every pixel formula in the engine (color conversions, adjustments,
//! blend modes) is written once against the [`Scalar`] trait. Two
//! families of implementations exist:
//!
//! - `f32` / `f64` — direct evaluation, used by the renderer;
//! - [`ExprScalar`] — records the same computation into an [`ExprGraph`]
//!   (an index-linked arena of steps), used to build optimizer cost
//!   functions and to generate standalone source for the external Ceres
//!   harness.
//!
//! Branchy formulas are packaged as [`PrimitiveFn`] catalog entries so the
//! symbolic mode records a named call instead of attempting to branch on a
//! graph value. See the `scalar` module docs for the full contract.

#![warn(missing_docs)]

pub mod error;
pub mod scalar;
pub mod graph;

pub use error::{ExprError, Result};
pub use graph::{
    BinaryOp, ExprGraph, ExprScalar, ExprTrace, ParamBank, SourceMode, Step, UnaryOp,
};
pub use scalar::{PrimitiveFn, Real, Scalar};
