//! 1-D tone curve evaluated as a cubic Hermite spline.
//!
//! Tangents are Catmull-Rom style: interior points use the central
//! difference over their neighbors, endpoints use the one-sided
//! difference. Evaluation outside the control-point domain clamps to the
//! nearest endpoint's value.

use crate::{ColorError, Result};
use retouch_expr::{PrimitiveFn, Real};
use std::sync::Arc;

/// A control point of a [`Curve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Input position.
    pub x: f32,
    /// Output value.
    pub y: f32,
}

impl Point {
    /// Constructs a control point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A cubic Hermite tone curve over sorted control points.
///
/// # Example
///
/// ```rust
/// use retouch_color::{Curve, Point};
///
/// let identity = Curve::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]).unwrap();
/// assert!((identity.eval(0.25f32) - 0.25).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pts: Vec<Point>,
    tangents: Vec<f32>,
}

impl Curve {
    /// Builds a curve from control points. Points are sorted by `x`.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::DegenerateCurve`] for fewer than two points
    /// or duplicate `x` positions.
    pub fn new(mut pts: Vec<Point>) -> Result<Self> {
        if pts.len() < 2 {
            return Err(ColorError::DegenerateCurve(pts.len()));
        }
        pts.sort_by(|a, b| a.x.total_cmp(&b.x));
        if pts.windows(2).any(|w| w[0].x == w[1].x) {
            return Err(ColorError::DegenerateCurve(pts.len()));
        }

        let tangents = compute_tangents(&pts);
        Ok(Self { pts, tangents })
    }

    /// The sorted control points.
    pub fn points(&self) -> &[Point] {
        &self.pts
    }

    /// Evaluates the curve at `x`, clamping outside the domain.
    pub fn eval<T: Real>(&self, x: T) -> T {
        let first = &self.pts[0];
        let last = &self.pts[self.pts.len() - 1];

        if x <= T::from_f32(first.x) {
            return T::from_f32(first.y);
        }
        if x >= T::from_f32(last.x) {
            return T::from_f32(last.y);
        }

        // Find the segment containing x.
        let mut k = 0;
        for i in 0..self.pts.len() - 1 {
            if x >= T::from_f32(self.pts[i].x) && x < T::from_f32(self.pts[i + 1].x) {
                k = i;
                break;
            }
        }

        let p0 = self.pts[k];
        let p1 = self.pts[k + 1];
        let m0 = T::from_f32(self.tangents[k]);
        let m1 = T::from_f32(self.tangents[k + 1]);
        let h = T::from_f32(p1.x - p0.x);
        let t = (x - T::from_f32(p0.x)) / h;

        let t2 = t * t;
        let t3 = t2 * t;
        let one = T::from_f32(1.0);
        let two = T::from_f32(2.0);
        let three = T::from_f32(3.0);

        let h00 = two * t3 - three * t2 + one;
        let h10 = t3 - two * t2 + t;
        let h01 = -(two * t3) + three * t2;
        let h11 = t3 - t2;

        h00 * T::from_f32(p0.y) + h10 * h * m0 + h01 * T::from_f32(p1.y) + h11 * h * m1
    }
}

fn compute_tangents(pts: &[Point]) -> Vec<f32> {
    let n = pts.len();
    let mut m = vec![0.0f32; n];
    for i in 0..n {
        m[i] = if i == 0 {
            (pts[1].y - pts[0].y) / (pts[1].x - pts[0].x)
        } else if i == n - 1 {
            (pts[n - 1].y - pts[n - 2].y) / (pts[n - 1].x - pts[n - 2].x)
        } else {
            (pts[i + 1].y - pts[i - 1].y) / (pts[i + 1].x - pts[i - 1].x)
        };
    }
    m
}

/// Data-carrying primitive exposing a [`Curve`] to symbolic traces.
///
/// Arity 1, one result; generated source refers to it by the name given
/// at construction (e.g. `curve_bg_r`).
#[derive(Debug, Clone)]
pub struct CurveFn {
    curve: Arc<Curve>,
    name: String,
}

impl CurveFn {
    /// Wraps a curve under a trace-visible name.
    pub fn new(curve: Arc<Curve>, name: impl Into<String>) -> Self {
        Self {
            curve,
            name: name.into(),
        }
    }
}

impl PrimitiveFn for CurveFn {
    fn name(&self) -> &str {
        &self.name
    }
    fn arity(&self) -> usize {
        1
    }
    fn results(&self) -> usize {
        1
    }
    fn eval32(&self, args: &[f32]) -> Vec<f32> {
        vec![self.curve.eval(args[0])]
    }
    fn eval64(&self, args: &[f64]) -> Vec<f64> {
        vec![self.curve.eval(args[0])]
    }
}
