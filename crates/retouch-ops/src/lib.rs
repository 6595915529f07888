//! # retouch-ops
//!
//! The pixel-transform catalog of the retouch engine: blend-mode channel
//! functions, per-layer adjustments, and conditional-blend gating.
//!
//! Every formula is written once against the dual-mode
//! [`Scalar`](retouch_expr::Scalar) interface; branchy bodies live behind
//! [`PrimitiveFn`](retouch_expr::PrimitiveFn) catalog entries so the same
//! code renders pixels and builds optimizer traces.
//!
//! # Modules
//!
//! - [`blend`] — Normal through Pin Light, plus the `cvtT`/`clamp`
//!   helpers and the Linear Dodge alpha override
//! - [`adjustments`] — HSL, levels, curves, exposure, gradient map,
//!   selective color, color balance, photo filter, the colorize family,
//!   invert, brightness/contrast
//! - [`cond`] — "blend if" tonal gating windows

#![warn(missing_docs)]

pub mod adjustments;
pub mod blend;
pub mod cond;

pub use adjustments::{
    brightness_adjust, clamp_rgb, color_balance_adjust, colorize_adjust, curves_adjust,
    exposure_adjust, gradient_map_adjust, hsl_adjust, invert_adjust, levels_adjust,
    lighter_colorize_adjust, overwrite_color_adjust, photo_filter_adjust, selective_color_adjust,
    ColorBalanceFn, ColorizeFn, LevelsFn, LighterColorizeFn, PhotoFilterFn, SelectiveColorFn,
    SELECTIVE_COLOR_CHANNELS, SELECTIVE_COLOR_COLORS,
};
pub use blend::{
    clamp01, color_burn, cvt, linear_dodge, multiply, normal, screen, vivid_light, ClampFn,
    ColorBlendFn, ColorDodgeFn, CvtFn, DarkenFn, HardLightFn, LightenFn, LinearBurnFn,
    LinearDodgeAlphaFn, LinearLightFn, OverlayFn, PinLightFn, SoftLightFn,
};
pub use cond::{BlendRange, BlendTarget, CondBlendFn, ConditionalBlend};
