//! The [`Scalar`] and [`Real`] capability traits.
//!
//! Every adjustment and blend formula in the engine is written once,
//! generically, against these traits. Instantiated at `f32` the formulas
//! render pixels; instantiated at [`ExprScalar`](crate::ExprScalar) the
//! same code builds an expression graph for cost-function generation.
//!
//! The split between the two traits is deliberate:
//!
//! - [`Real`] is the *concrete float* capability. It adds comparisons,
//!   `min`/`max` and friends, so branchy formula bodies (levels, the
//!   piecewise blend modes, the color space conversions) can be written
//!   naturally. Only `f32` and `f64` implement it.
//! - [`Scalar`] is the *dual-mode* capability: arithmetic operators plus
//!   [`Scalar::invoke`] for calling a named primitive. Branches never
//!   appear at this level — a formula that needs one must be wrapped in a
//!   [`PrimitiveFn`] so the symbolic instantiation records a call node
//!   instead of trying to branch on a graph value.
//!
//! Any new formula must follow the same rule, or the numeric and symbolic
//! modes will diverge.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// Concrete floating-point capability (`f32`, `f64` only).
///
/// Primitive bodies are written against this trait and instantiated for
/// both widths; the `f32` instantiation renders, the `f64` instantiation
/// backs symbolic graph evaluation.
pub trait Real:
    Copy
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Lifts an `f32` constant.
    fn from_f32(v: f32) -> Self;
    /// Lowers to `f64` (exact for both implementors).
    fn to_f64(self) -> f64;
    /// Square root.
    fn sqrt(self) -> Self;
    /// `self` raised to `e`.
    fn powf(self, e: Self) -> Self;
    /// Absolute value.
    fn abs(self) -> Self;
    /// Elementwise minimum.
    fn min(self, other: Self) -> Self;
    /// Elementwise maximum.
    fn max(self, other: Self) -> Self;
    /// Largest integer value not greater than `self`.
    fn floor(self) -> Self;

    /// Clamp into `[lo, hi]`.
    #[inline]
    fn clamp_to(self, lo: Self, hi: Self) -> Self {
        self.max(lo).min(hi)
    }

    /// Euclidean-style remainder used for hue wrapping; result is in
    /// `[0, m)` for positive `m`.
    #[inline]
    fn wrap(self, m: Self) -> Self {
        self - (self / m).floor() * m
    }
}

impl Real for f32 {
    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
    #[inline]
    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }
    #[inline]
    fn powf(self, e: Self) -> Self {
        f32::powf(self, e)
    }
    #[inline]
    fn abs(self) -> Self {
        f32::abs(self)
    }
    #[inline]
    fn min(self, other: Self) -> Self {
        f32::min(self, other)
    }
    #[inline]
    fn max(self, other: Self) -> Self {
        f32::max(self, other)
    }
    #[inline]
    fn floor(self) -> Self {
        f32::floor(self)
    }
}

impl Real for f64 {
    #[inline]
    fn from_f32(v: f32) -> Self {
        v as f64
    }
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    #[inline]
    fn powf(self, e: Self) -> Self {
        f64::powf(self, e)
    }
    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }
    #[inline]
    fn min(self, other: Self) -> Self {
        f64::min(self, other)
    }
    #[inline]
    fn max(self, other: Self) -> Self {
        f64::max(self, other)
    }
    #[inline]
    fn floor(self) -> Self {
        f64::floor(self)
    }
}

/// A named primitive operation in the fixed formula catalog.
///
/// Primitives are the only place branching on values is allowed. The
/// numeric instantiations call [`eval32`](PrimitiveFn::eval32) /
/// [`eval64`](PrimitiveFn::eval64) directly; the symbolic instantiation
/// records a call node carrying the primitive itself, so graph evaluation
/// and generated source refer to it by [`name`](PrimitiveFn::name).
///
/// Implementations are typically zero-sized structs wrapping a generic
/// `fn<T: Real>(&[T]) -> Vec<T>` body (see the `primitive_fn!` macro), but
/// data-carrying primitives (a curve with its control points, a gradient
/// with its stops) are equally valid — they close over their data.
pub trait PrimitiveFn: Send + Sync {
    /// Function name used in generated source.
    fn name(&self) -> &str;
    /// Number of scalar arguments.
    fn arity(&self) -> usize;
    /// Number of scalar results.
    fn results(&self) -> usize;
    /// Evaluate at `f32`.
    fn eval32(&self, args: &[f32]) -> Vec<f32>;
    /// Evaluate at `f64`.
    fn eval64(&self, args: &[f64]) -> Vec<f64>;
}

/// Defines a zero-sized [`PrimitiveFn`] wrapper around a generic function
/// `fn name<T: Real>(args: &[T]) -> Vec<T>`.
///
/// ```ignore
/// fn double_impl<T: Real>(args: &[T]) -> Vec<T> {
///     vec![args[0] + args[0]]
/// }
/// primitive_fn!(DoubleFn, "double", 1, 1, double_impl);
/// ```
#[macro_export]
macro_rules! primitive_fn {
    ($vis:vis $ty:ident, $name:literal, $arity:literal, $results:literal, $body:path) => {
        /// Primitive catalog entry; invoke through `Scalar::invoke`.
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $ty;

        impl $crate::PrimitiveFn for $ty {
            fn name(&self) -> &str {
                $name
            }
            fn arity(&self) -> usize {
                $arity
            }
            fn results(&self) -> usize {
                $results
            }
            fn eval32(&self, args: &[f32]) -> Vec<f32> {
                debug_assert_eq!(args.len(), $arity);
                $body(args)
            }
            fn eval64(&self, args: &[f64]) -> Vec<f64> {
                debug_assert_eq!(args.len(), $arity);
                $body(args)
            }
        }
    };
}

/// Dual-mode scalar capability.
///
/// Implemented by `f32`/`f64` (direct evaluation) and by
/// [`ExprScalar`](crate::ExprScalar) (graph building). Formulas written
/// against this trait run identically in both modes as long as they avoid
/// value-dependent control flow outside [`Scalar::invoke`].
pub trait Scalar:
    Clone
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Sized
{
    /// Lifts an `f32` constant into this scalar representation.
    fn from_f32(v: f32) -> Self;
    /// Square root.
    fn sqrt(self) -> Self;
    /// `self` raised to `e`.
    fn powf(self, e: Self) -> Self;
    /// Calls a registered primitive with the given arguments.
    fn invoke<F: PrimitiveFn + Clone + 'static>(f: &F, args: &[Self]) -> Vec<Self>;
}

impl Scalar for f32 {
    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
    #[inline]
    fn sqrt(self) -> Self {
        f32::sqrt(self)
    }
    #[inline]
    fn powf(self, e: Self) -> Self {
        f32::powf(self, e)
    }
    #[inline]
    fn invoke<F: PrimitiveFn + Clone + 'static>(f: &F, args: &[Self]) -> Vec<Self> {
        f.eval32(args)
    }
}

impl Scalar for f64 {
    #[inline]
    fn from_f32(v: f32) -> Self {
        v as f64
    }
    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    #[inline]
    fn powf(self, e: Self) -> Self {
        f64::powf(self, e)
    }
    #[inline]
    fn invoke<F: PrimitiveFn + Clone + 'static>(f: &F, args: &[Self]) -> Vec<Self> {
        f.eval64(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double_impl<T: Real>(args: &[T]) -> Vec<T> {
        vec![args[0] + args[0]]
    }
    primitive_fn!(DoubleFn, "double", 1, 1, double_impl);

    #[test]
    fn test_primitive_macro_both_widths() {
        let f = DoubleFn;
        assert_eq!(f.eval32(&[2.0]), vec![4.0]);
        assert_eq!(f.eval64(&[2.0]), vec![4.0]);
        assert_eq!(f.name(), "double");
        assert_eq!(f.arity(), 1);
    }

    #[test]
    fn test_scalar_invoke_f32() {
        let out = <f32 as Scalar>::invoke(&DoubleFn, &[3.0]);
        assert_eq!(out, vec![6.0]);
    }

    #[test]
    fn test_real_wrap() {
        assert_eq!(370.0f32.wrap(360.0), 10.0);
        assert_eq!((-10.0f32).wrap(360.0), 350.0);
    }
}
