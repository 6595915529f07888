//! # retouch-color
//!
//! Color space conversions and 1-D evaluators for the retouch engine.
//!
//! - [`spaces`] — `Rgb`/`Hsl`/`Hsy`/`Cmyk`/`Lab` records and conversions,
//!   generic over the concrete float width, plus primitive-catalog
//!   wrappers so symbolic traces call them by name.
//! - [`curve`] — Catmull-Rom cubic Hermite tone curves.
//! - [`gradient`] — piecewise-linear color gradients.

#![warn(missing_docs)]

pub mod curve;
pub mod error;
pub mod gradient;
pub mod spaces;

pub use curve::{Curve, CurveFn, Point};
pub use error::{ColorError, Result};
pub use gradient::{Gradient, GradientFn, GradientStop};
pub use spaces::{
    cmyk_to_rgb, hsl_to_rgb, hsy_to_rgb, lab_to_rgb, rgb_to_cmyk, rgb_to_hsl, rgb_to_hsy,
    rgb_to_lab, Cmyk, CmykToRgbFn, Hsl, HslToRgbFn, Hsy, HsyToRgbFn, Lab, LabToRgbFn, Rgb,
    RgbToCmykFn, RgbToHslFn, RgbToHsyFn, RgbToLabFn,
};
