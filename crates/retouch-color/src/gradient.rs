//! Piecewise-linear color gradient used by the gradient-map adjustment.

use crate::{ColorError, Result, Rgb};
use retouch_expr::{PrimitiveFn, Real};
use std::sync::Arc;

/// An ordered gradient stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Position in `[0, 1]`.
    pub position: f32,
    /// Stop color.
    pub color: Rgb<f32>,
}

/// A piecewise-linear gradient over sorted stops.
///
/// Evaluation below the first or above the last stop clamps to the
/// nearest stop's color.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    stops: Vec<GradientStop>,
}

impl Gradient {
    /// Builds a gradient, sorting stops by position.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::DegenerateGradient`] when no stops are given.
    pub fn new(mut stops: Vec<GradientStop>) -> Result<Self> {
        if stops.is_empty() {
            return Err(ColorError::DegenerateGradient);
        }
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        Ok(Self { stops })
    }

    /// The sorted stops.
    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    /// Evaluates the gradient color at `t`.
    pub fn eval<T: Real>(&self, t: T) -> Rgb<T> {
        let lift = |c: Rgb<f32>| Rgb::new(T::from_f32(c.r), T::from_f32(c.g), T::from_f32(c.b));

        let first = &self.stops[0];
        let last = &self.stops[self.stops.len() - 1];
        if t <= T::from_f32(first.position) {
            return lift(first.color);
        }
        if t >= T::from_f32(last.position) {
            return lift(last.color);
        }

        for w in self.stops.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            if t >= T::from_f32(a.position) && t <= T::from_f32(b.position) {
                let span = b.position - a.position;
                if span == 0.0 {
                    return lift(b.color);
                }
                let f = (t - T::from_f32(a.position)) / T::from_f32(span);
                let one = T::from_f32(1.0);
                return Rgb::new(
                    T::from_f32(a.color.r) * (one - f) + T::from_f32(b.color.r) * f,
                    T::from_f32(a.color.g) * (one - f) + T::from_f32(b.color.g) * f,
                    T::from_f32(a.color.b) * (one - f) + T::from_f32(b.color.b) * f,
                );
            }
        }

        lift(last.color)
    }
}

/// Data-carrying primitive exposing a [`Gradient`] to symbolic traces.
///
/// Arity 1 (the lookup position), three results (R, G, B).
#[derive(Debug, Clone)]
pub struct GradientFn {
    gradient: Arc<Gradient>,
    name: String,
}

impl GradientFn {
    /// Wraps a gradient under a trace-visible name.
    pub fn new(gradient: Arc<Gradient>, name: impl Into<String>) -> Self {
        Self {
            gradient,
            name: name.into(),
        }
    }
}

impl PrimitiveFn for GradientFn {
    fn name(&self) -> &str {
        &self.name
    }
    fn arity(&self) -> usize {
        1
    }
    fn results(&self) -> usize {
        3
    }
    fn eval32(&self, args: &[f32]) -> Vec<f32> {
        let c = self.gradient.eval(args[0]);
        vec![c.r, c.g, c.b]
    }
    fn eval64(&self, args: &[f64]) -> Vec<f64> {
        let c = self.gradient.eval(args[0]);
        vec![c.r, c.g, c.b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn black_to_white() -> Gradient {
        Gradient::new(vec![
            GradientStop {
                position: 0.0,
                color: Rgb::new(0.0, 0.0, 0.0),
            },
            GradientStop {
                position: 1.0,
                color: Rgb::new(1.0, 1.0, 1.0),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_linear_interpolation() {
        let g = black_to_white();
        let mid = g.eval(0.5f32);
        assert_relative_eq!(mid.r, 0.5);
        assert_relative_eq!(mid.g, 0.5);
        assert_relative_eq!(mid.b, 0.5);
    }

    #[test]
    fn test_clamps_at_ends() {
        let g = Gradient::new(vec![
            GradientStop {
                position: 0.25,
                color: Rgb::new(1.0, 0.0, 0.0),
            },
            GradientStop {
                position: 0.75,
                color: Rgb::new(0.0, 0.0, 1.0),
            },
        ])
        .unwrap();
        assert_relative_eq!(g.eval(0.0f32).r, 1.0);
        assert_relative_eq!(g.eval(1.0f32).b, 1.0);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(Gradient::new(vec![]).is_err());
    }

    #[test]
    fn test_single_stop_is_constant() {
        let g = Gradient::new(vec![GradientStop {
            position: 0.5,
            color: Rgb::new(0.2, 0.4, 0.6),
        }])
        .unwrap();
        assert_relative_eq!(g.eval(0.0f32).g, 0.4);
        assert_relative_eq!(g.eval(1.0f32).g, 0.4);
    }
}
