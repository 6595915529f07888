//! Conditional-blend ("blend if") tonal gating.
//!
//! A layer may restrict where it blends by windowing on the brightness of
//! a chosen channel, independently for the source layer and the composite
//! underneath. Each window is four positions `b0 <= b1 <= w0 <= w1`
//! describing a ramp-up over `[b0, b1]`, a full-pass plateau over
//! `[b1, w0]` and a ramp-down over `[w0, w1]`. The source and destination
//! weights multiply into the layer's effective source alpha.

use retouch_expr::{PrimitiveFn, Real};
use serde::{Deserialize, Serialize};

/// Channel sampled by a conditional-blend window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendTarget {
    /// Red channel.
    Red,
    /// Green channel.
    Green,
    /// Blue channel.
    Blue,
    /// Rec. 601 luma.
    #[default]
    Luma,
}

impl BlendTarget {
    /// Samples the gated value from a normalized RGB triple.
    #[inline]
    pub fn sample<T: Real>(self, r: T, g: T, b: T) -> T {
        match self {
            BlendTarget::Red => r,
            BlendTarget::Green => g,
            BlendTarget::Blue => b,
            BlendTarget::Luma => {
                T::from_f32(0.299) * r + T::from_f32(0.587) * g + T::from_f32(0.114) * b
            }
        }
    }
}

/// One feathered brightness window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendRange {
    /// Ramp-up start.
    pub low_min: f32,
    /// Ramp-up end / plateau start.
    pub low_max: f32,
    /// Plateau end / ramp-down start.
    pub high_min: f32,
    /// Ramp-down end.
    pub high_max: f32,
}

impl Default for BlendRange {
    fn default() -> Self {
        Self::full()
    }
}

impl BlendRange {
    /// A window passing everything.
    pub fn full() -> Self {
        Self {
            low_min: 0.0,
            low_max: 0.0,
            high_min: 1.0,
            high_max: 1.0,
        }
    }

    /// Weight of a brightness value against this window. Zero-width ramps
    /// degenerate to hard steps.
    pub fn weight<T: Real>(&self, v: T) -> T {
        let zero = T::from_f32(0.0);
        let one = T::from_f32(1.0);
        let lo0 = T::from_f32(self.low_min);
        let lo1 = T::from_f32(self.low_max);
        let hi0 = T::from_f32(self.high_min);
        let hi1 = T::from_f32(self.high_max);

        if v < lo0 {
            zero
        } else if v < lo1 {
            (v - lo0) / (lo1 - lo0)
        } else if v <= hi0 {
            one
        } else if v <= hi1 {
            // zero-width ramps never reach this arm, so the division is safe
            one - (v - hi0) / (hi1 - hi0)
        } else {
            zero
        }
    }
}

/// Full conditional-blend configuration for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionalBlend {
    /// Channel the windows sample.
    pub target: BlendTarget,
    /// Window applied to the source layer's pixel.
    pub source: BlendRange,
    /// Window applied to the composite underneath.
    pub dest: BlendRange,
}

impl ConditionalBlend {
    /// `true` when the configuration gates nothing.
    pub fn is_pass_through(&self) -> bool {
        self.source == BlendRange::full() && self.dest == BlendRange::full()
    }

    /// Combined multiplicative alpha scale for a source/destination pixel
    /// pair.
    pub fn alpha_scale<T: Real>(&self, src: [T; 3], dst: [T; 3]) -> T {
        let sv = self.target.sample(src[0], src[1], src[2]);
        let dv = self.target.sample(dst[0], dst[1], dst[2]);
        self.source.weight(sv) * self.dest.weight(dv)
    }
}

/// Data-carrying primitive exposing a layer's conditional blend to
/// symbolic traces. Args: `[sr, sg, sb, dr, dg, db]`, one result (the
/// alpha scale).
#[derive(Debug, Clone)]
pub struct CondBlendFn {
    cond: ConditionalBlend,
    name: String,
}

impl CondBlendFn {
    /// Wraps a configuration under a trace-visible name.
    pub fn new(cond: ConditionalBlend, name: impl Into<String>) -> Self {
        Self {
            cond,
            name: name.into(),
        }
    }
}

impl PrimitiveFn for CondBlendFn {
    fn name(&self) -> &str {
        &self.name
    }
    fn arity(&self) -> usize {
        6
    }
    fn results(&self) -> usize {
        1
    }
    fn eval32(&self, args: &[f32]) -> Vec<f32> {
        vec![self
            .cond
            .alpha_scale([args[0], args[1], args[2]], [args[3], args[4], args[5]])]
    }
    fn eval64(&self, args: &[f64]) -> Vec<f64> {
        vec![self
            .cond
            .alpha_scale([args[0], args[1], args[2]], [args[3], args[4], args[5]])]
    }
}
