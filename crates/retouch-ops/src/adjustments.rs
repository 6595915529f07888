//! Per-layer adjustment pixel transforms.
//!
//! Each adjustment is a pure function of an RGB triple plus its named
//! parameters; alpha is never touched. Stored parameter values live in the
//! UI-facing `[0, 1]` range and are rescaled here, inside the shared
//! formula, so both evaluation modes agree (signed parameters via
//! `(x - 0.5) * 2`, hue via `(x - 0.5) * 360`, exposure stops via
//! `(x - 0.5) * 10`, gamma via `x * 10`).
//!
//! Branchy formulas (levels, selective color, color balance, photo
//! filter, the colorize family) are primitive-catalog entries; the
//! `*_adjust` wrappers route through [`Scalar::invoke`] so symbolic
//! traces record named calls.

use retouch_color::{
    cmyk_to_rgb, hsl_to_rgb, hsy_to_rgb, rgb_to_cmyk, rgb_to_hsl, rgb_to_hsy, CurveFn, GradientFn,
    HslToRgbFn, RgbToHslFn,
};
use retouch_expr::{primitive_fn, Real, Scalar};

use crate::blend::{clamp01, ClampFn};

#[inline]
fn max3<T: Real>(a: T, b: T, c: T) -> T {
    a.max(b).max(c)
}

#[inline]
fn min3<T: Real>(a: T, b: T, c: T) -> T {
    a.min(b).min(c)
}

/// HSL shift: hue by `(hue - 0.5) * 360` degrees, saturation and
/// lightness by `(x - 0.5) * 2`.
pub fn hsl_adjust<S: Scalar>(rgb: [S; 3], hue: S, sat: S, light: S) -> [S; 3] {
    let [r, g, b] = rgb;
    let hsl = S::invoke(&RgbToHslFn, &[r, g, b]);

    let half = S::from_f32(0.5);
    let h = hsl[0].clone() + (hue - half.clone()) * S::from_f32(360.0);
    let s = hsl[1].clone() + (sat - half.clone()) * S::from_f32(2.0);
    let l = hsl[2].clone() + (light - half) * S::from_f32(2.0);

    let rgb = S::invoke(&HslToRgbFn, &[h, s, l]);
    [
        clamp01(rgb[0].clone()),
        clamp01(rgb[1].clone()),
        clamp01(rgb[2].clone()),
    ]
}

/// Levels remap body: input window (degenerate window forces 1), gamma
/// with a 1e-6 floor, output window.
pub fn levels_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (px, in_min, in_max, gamma, out_min, out_max) =
        (args[0], args[1], args[2], args[3], args[4], args[5]);
    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);

    let out = if in_max == in_min {
        one
    } else {
        ((px - in_min).max(zero) / (in_max - in_min)).min(one)
    };

    let g = gamma.max(T::from_f32(1e-6));
    let out = out.powf(one / g);

    vec![out * (out_max - out_min) + out_min]
}

primitive_fn!(pub LevelsFn, "levels", 6, 1, levels_impl);

/// Levels adjustment; the stored gamma is rescaled by 10 before the
/// remap (stored 0.1 means gamma 1.0, a no-op).
pub fn levels_adjust<S: Scalar>(
    rgb: [S; 3],
    in_min: S,
    in_max: S,
    gamma: S,
    out_min: S,
    out_max: S,
) -> [S; 3] {
    let g = gamma * S::from_f32(10.0);
    rgb.map(|px| {
        S::invoke(
            &LevelsFn,
            &[
                px,
                in_min.clone(),
                in_max.clone(),
                g.clone(),
                out_min.clone(),
                out_max.clone(),
            ],
        )
        .remove(0)
    })
}

/// Per-channel curve lookups, optionally followed by a combined master
/// curve applied to all three channels.
pub fn curves_adjust<S: Scalar>(
    rgb: [S; 3],
    r_curve: Option<&CurveFn>,
    g_curve: Option<&CurveFn>,
    b_curve: Option<&CurveFn>,
    master: Option<&CurveFn>,
) -> [S; 3] {
    let apply = |v: S, c: Option<&CurveFn>| match c {
        Some(c) => S::invoke(c, &[v]).remove(0),
        None => v,
    };

    let [r, g, b] = rgb;
    let r = apply(r, r_curve);
    let g = apply(g, g_curve);
    let b = apply(b, b_curve);

    [
        apply(r, master),
        apply(g, master),
        apply(b, master),
    ]
}

/// Exposure: `clamp(pow(px * 2^stops + offset, 1/gamma), 0, 1)` with
/// stops in `[-5, 5]`, offset in `[-0.5, 0.5]`, gamma scaled by 10.
pub fn exposure_adjust<S: Scalar>(rgb: [S; 3], exposure: S, offset: S, gamma: S) -> [S; 3] {
    let half = S::from_f32(0.5);
    let stops = (exposure - half.clone()) * S::from_f32(10.0);
    let off = offset - half;
    let g = gamma * S::from_f32(10.0);

    let scale = S::from_f32(2.0).powf(stops);
    let inv_g = S::from_f32(1.0) / g;

    rgb.map(|px| clamp01((px * scale.clone() + off.clone()).powf(inv_g.clone())))
}

/// Gradient map: replace RGB with the gradient color at the pixel's
/// Rec. 601 luma.
pub fn gradient_map_adjust<S: Scalar>(rgb: [S; 3], gradient: &GradientFn) -> [S; 3] {
    let [r, g, b] = rgb;
    let y = S::from_f32(0.299) * r + S::from_f32(0.587) * g + S::from_f32(0.114) * b;
    let mapped = S::invoke(gradient, &[y]);
    [
        clamp01(mapped[0].clone()),
        clamp01(mapped[1].clone()),
        clamp01(mapped[2].clone()),
    ]
}

/// Selective-color channel order: lexicographic, matching the flattened
/// 36-entry parameter grid.
pub const SELECTIVE_COLOR_CHANNELS: [&str; 9] = [
    "blacks", "blues", "cyans", "greens", "magentas", "neutrals", "reds", "whites", "yellows",
];

/// Selective-color color order within a channel: lexicographic CMYK.
pub const SELECTIVE_COLOR_COLORS: [&str; 4] = ["black", "cyan", "magenta", "yellow"];

// Chromatic 60-degree hue bands, indexed by hue / 60, mapped into the
// lexicographic channel table above.
const HUE_BAND_CHANNEL: [usize; 6] = [6, 8, 3, 2, 1, 4]; // reds yellows greens cyans blues magentas

const CH_BLACKS: usize = 0;
const CH_NEUTRALS: usize = 5;
const CH_REDS: usize = 6;
const CH_WHITES: usize = 7;

/// Selective color body. Args: `[r, g, b]` then the 36-entry grid in
/// channel-major lexicographic order; stored values are rescaled
/// `(v - 0.5) * 2` here.
pub fn selective_color_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (r, g, b) = (args[0], args[1], args[2]);
    let two = T::from_f32(2.0);
    let half = T::from_f32(0.5);
    let one = T::from_f32(1.0);

    // grid lookup, rescaled to [-1, 1]
    let data = |channel: usize, color: usize| (args[3 + channel * 4 + color] - half) * two;

    let hsl = rgb_to_hsl(r, g, b);
    let chroma = max3(r, g, b) - min3(r, g, b);

    let interval = (hsl.h.to_f64() / 60.0).floor().max(0.0).min(5.0) as usize;
    let c1 = HUE_BAND_CHANNEL[interval];
    let c2 = if interval == 5 {
        CH_REDS // wrap around for magenta
    } else {
        HUE_BAND_CHANNEL[interval + 1]
    };
    let c3 = CH_NEUTRALS;
    let c4 = if hsl.l < half { CH_BLACKS } else { CH_WHITES };

    // hue weights across the 60-degree band, luma weights from midtone
    // distance, all scaled between chroma and its complement
    let wc = chroma;
    let w1 = one - (hsl.h - T::from_f32(interval as f32 * 60.0)) / T::from_f32(60.0);
    let w2 = one - w1;
    let w3 = one - (hsl.l - half).abs();
    let w4 = one - w3;

    let mut cmyk = rgb_to_cmyk(r, g, b);
    let adjust = |base: T, color: usize| {
        base + base * (w1 * data(c1, color) + w2 * data(c2, color)) * wc
            + (w3 * data(c3, color) + w4 * data(c4, color)) * (one - wc)
    };
    cmyk.c = adjust(cmyk.c, 1);
    cmyk.m = adjust(cmyk.m, 2);
    cmyk.y = adjust(cmyk.y, 3);
    cmyk.k = adjust(cmyk.k, 0);

    let out = cmyk_to_rgb(cmyk.c, cmyk.m, cmyk.y, cmyk.k);
    let zero = T::from_f32(0.0);
    vec![
        out.r.clamp_to(zero, one),
        out.g.clamp_to(zero, one),
        out.b.clamp_to(zero, one),
    ]
}

primitive_fn!(pub SelectiveColorFn, "selectiveColor", 39, 3, selective_color_impl);

/// Selective color adjustment over the fixed 36-entry grid.
pub fn selective_color_adjust<S: Scalar>(rgb: [S; 3], grid: &[S]) -> [S; 3] {
    debug_assert_eq!(grid.len(), 36);
    let mut args = Vec::with_capacity(39);
    args.extend(rgb);
    args.extend_from_slice(grid);
    let out = S::invoke(&SelectiveColorFn, &args);
    let [r, g, b]: [S; 3] = out.try_into().ok().expect("selectiveColor returns 3");
    [r, g, b]
}

// Fixed tonal-range window constants shared by the three color balance
// regions.
fn balance_channel<T: Real>(px: T, shadow: T, mid: T, high: T) -> T {
    let a = T::from_f32(0.25);
    let b = T::from_f32(0.333);
    let scale = T::from_f32(0.7);
    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);
    let half = T::from_f32(0.5);

    let s = shadow * (((px - b) / -a + half).clamp_to(zero, one) * scale);
    let m = mid
        * (((px - b) / a + half).clamp_to(zero, one)
            * ((px + b - one) / -a + half).clamp_to(zero, one)
            * scale);
    let h = high * (((px + b - one) / a + half).clamp_to(zero, one) * scale);

    (px + s + m + h).clamp_to(zero, one)
}

/// Color balance body. Args: `[r, g, b, shadowR, shadowG, shadowB, midR,
/// midG, midB, highR, highG, highB, preserveLuma]`; the nine tone values
/// are rescaled `(v - 0.5) * 2` here.
pub fn color_balance_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (r, g, b) = (args[0], args[1], args[2]);
    let half = T::from_f32(0.5);
    let two = T::from_f32(2.0);
    let signed = |v: T| (v - half) * two;

    let mut balanced = [
        balance_channel(r, signed(args[3]), signed(args[6]), signed(args[9])),
        balance_channel(g, signed(args[4]), signed(args[7]), signed(args[10])),
        balance_channel(b, signed(args[5]), signed(args[8]), signed(args[11])),
    ];

    if args[12] > half {
        let hsl = rgb_to_hsl(balanced[0], balanced[1], balanced[2]);
        let original_luma = half * (max3(r, g, b) + min3(r, g, b));
        let rgb = hsl_to_rgb(hsl.h, hsl.s, original_luma);
        balanced = [rgb.r, rgb.g, rgb.b];
    }

    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);
    balanced.iter().map(|&v| v.clamp_to(zero, one)).collect()
}

primitive_fn!(pub ColorBalanceFn, "colorBalanceAdjust", 13, 3, color_balance_impl);

/// Color balance adjustment: nine shadow/mid/high tone values plus the
/// luma-preservation flag.
pub fn color_balance_adjust<S: Scalar>(rgb: [S; 3], tones: &[S], preserve_luma: S) -> [S; 3] {
    debug_assert_eq!(tones.len(), 9);
    let mut args = Vec::with_capacity(13);
    args.extend(rgb);
    args.extend_from_slice(tones);
    args.push(preserve_luma);
    let out = S::invoke(&ColorBalanceFn, &args);
    let [r, g, b]: [S; 3] = out.try_into().ok().expect("colorBalanceAdjust returns 3");
    [r, g, b]
}

/// Photo filter body. Args: `[r, g, b, density, filterR, filterG,
/// filterB, preserveLuma]`.
pub fn photo_filter_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (r, g, b) = (args[0], args[1], args[2]);
    let d = args[3];
    let mut fr = r * args[4];
    let mut fg = g * args[5];
    let mut fb = b * args[6];
    let half = T::from_f32(0.5);

    if args[7] > half {
        let hsl = rgb_to_hsl(fr, fg, fb);
        let original_luma = half * (max3(r, g, b) + min3(r, g, b));
        let rgb = hsl_to_rgb(hsl.h, hsl.s, original_luma);
        fr = rgb.r;
        fg = rgb.g;
        fb = rgb.b;
    }

    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);
    vec![
        (fr * d + r * (one - d)).clamp_to(zero, one),
        (fg * d + g * (one - d)).clamp_to(zero, one),
        (fb * d + b * (one - d)).clamp_to(zero, one),
    ]
}

primitive_fn!(pub PhotoFilterFn, "photoFilter", 8, 3, photo_filter_impl);

/// Photo filter adjustment.
pub fn photo_filter_adjust<S: Scalar>(
    rgb: [S; 3],
    density: S,
    filter: [S; 3],
    preserve_luma: S,
) -> [S; 3] {
    let [r, g, b] = rgb;
    let [fr, fg, fb] = filter;
    let out = S::invoke(&PhotoFilterFn, &[r, g, b, density, fr, fg, fb, preserve_luma]);
    let [r, g, b]: [S; 3] = out.try_into().ok().expect("photoFilter returns 3");
    [r, g, b]
}

/// Colorize body: transplant the solid color's HSY hue and chroma onto
/// the destination luma, then alpha-blend with the original. Args:
/// `[r, g, b, sr, sg, sb, a]`.
pub fn colorize_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (r, g, b) = (args[0], args[1], args[2]);
    let (sr, sg, sb) = (args[3], args[4], args[5]);
    let a = args[6];
    let one = T::from_f32(1.0);
    let zero = T::from_f32(0.0);

    let mut dc = rgb_to_hsy(r, g, b);
    let sc = rgb_to_hsy(sr, sg, sb);
    dc.h = sc.h;
    dc.s = sc.s;
    let res = hsy_to_rgb(dc.h, dc.s, dc.y);

    vec![
        (res.r * a + r * (one - a)).clamp_to(zero, one),
        (res.g * a + g * (one - a)).clamp_to(zero, one),
        (res.b * a + b * (one - a)).clamp_to(zero, one),
    ]
}

primitive_fn!(pub ColorizeFn, "colorizeAdjust", 7, 3, colorize_impl);

/// Lighter colorize body: keep whichever of the solid color and the
/// destination has the greater Rec. 601 luma. The historical alpha
/// weighting collapses to the chosen color and is kept verbatim. Args:
/// `[r, g, b, sr, sg, sb, a]`.
pub fn lighter_colorize_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (r, g, b) = (args[0], args[1], args[2]);
    let (sr, sg, sb) = (args[3], args[4], args[5]);
    let a = args[6];
    let one = T::from_f32(1.0);
    let zero = T::from_f32(0.0);

    let lr = T::from_f32(0.299);
    let lg = T::from_f32(0.587);
    let lb = T::from_f32(0.114);
    let y = lr * sr + lg * sg + lb * sb;
    let yp = lr * r + lg * g + lb * b;

    let cr = if yp > y { r } else { sr };
    let cg = if yp > y { g } else { sg };
    let cb = if yp > y { b } else { sb };

    vec![
        (cr * a + cr * (one - a)).clamp_to(zero, one),
        (cg * a + cg * (one - a)).clamp_to(zero, one),
        (cb * a + cb * (one - a)).clamp_to(zero, one),
    ]
}

primitive_fn!(pub LighterColorizeFn, "lighterColorizeAdjust", 7, 3, lighter_colorize_impl);

/// Colorize adjustment.
pub fn colorize_adjust<S: Scalar>(rgb: [S; 3], color: [S; 3], alpha: S) -> [S; 3] {
    let [r, g, b] = rgb;
    let [sr, sg, sb] = color;
    let out = S::invoke(&ColorizeFn, &[r, g, b, sr, sg, sb, alpha]);
    let [r, g, b]: [S; 3] = out.try_into().ok().expect("colorizeAdjust returns 3");
    [r, g, b]
}

/// Lighter colorize adjustment.
pub fn lighter_colorize_adjust<S: Scalar>(rgb: [S; 3], color: [S; 3], alpha: S) -> [S; 3] {
    let [r, g, b] = rgb;
    let [sr, sg, sb] = color;
    let out = S::invoke(&LighterColorizeFn, &[r, g, b, sr, sg, sb, alpha]);
    let [r, g, b]: [S; 3] = out.try_into().ok().expect("lighterColorizeAdjust returns 3");
    [r, g, b]
}

/// Overwrite color: straight alpha-weighted blend of the destination with
/// the given solid color. Branch-free, traces as raw arithmetic.
pub fn overwrite_color_adjust<S: Scalar>(rgb: [S; 3], color: [S; 3], alpha: S) -> [S; 3] {
    let one = S::from_f32(1.0);
    let [r, g, b] = rgb;
    let [sr, sg, sb] = color;
    [
        clamp01(sr * alpha.clone() + r * (one.clone() - alpha.clone())),
        clamp01(sg * alpha.clone() + g * (one.clone() - alpha.clone())),
        clamp01(sb * alpha.clone() + b * (one - alpha)),
    ]
}

/// Invert: `1 - channel`.
pub fn invert_adjust<S: Scalar>(rgb: [S; 3]) -> [S; 3] {
    rgb.map(|px| S::from_f32(1.0) - px)
}

/// Brightness/contrast. Both stored values rescale to `[-1, 1]`; the
/// contrast factor `1.01568 * (c + 1) / (1.01568 - c)` pivots around the
/// 0.5 midpoint, brightness adds.
pub fn brightness_adjust<S: Scalar>(rgb: [S; 3], brightness: S, contrast: S) -> [S; 3] {
    let half = S::from_f32(0.5);
    let two = S::from_f32(2.0);
    let b = (brightness - half.clone()) * two.clone();
    let c = (contrast - half.clone()) * two;

    let k = S::from_f32(1.015_68);
    let factor = k.clone() * (c.clone() + S::from_f32(1.0)) / (k - c);

    rgb.map(|px| clamp01((px - half.clone()) * factor.clone() + half.clone() + b.clone()))
}

/// Clamps all three channels into `[0, 1]` through the catalog entry.
pub fn clamp_rgb<S: Scalar>(rgb: [S; 3]) -> [S; 3] {
    rgb.map(|px| S::invoke(&ClampFn, &[px, S::from_f32(0.0), S::from_f32(1.0)]).remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_levels_degenerate_range_returns_out_max() {
        for &x in &[0.0f32, 0.3, 1.0] {
            let v = levels_impl(&[x, 0.4, 0.4, 1.0, 0.1, 0.9]);
            assert_relative_eq!(v[0], 0.9);
        }
    }

    #[test]
    fn test_levels_identity() {
        // full range, gamma 1, full output: no-op
        for &x in &[0.0f32, 0.25, 0.5, 1.0] {
            let v = levels_impl(&[x, 0.0, 1.0, 1.0, 0.0, 1.0]);
            assert_relative_eq!(v[0], x, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_levels_adjust_scales_gamma_by_ten() {
        // stored 0.1 -> gamma 1.0 -> 50% gray unchanged
        let out = levels_adjust([0.5f32, 0.5, 0.5], 0.0, 1.0, 0.1, 0.0, 1.0);
        for c in out {
            assert_relative_eq!(c, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_levels_gamma_floor() {
        let v = levels_impl(&[0.5f32, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert!(v[0].is_finite());
    }

    #[test]
    fn test_hsl_adjust_neutral_is_identity() {
        let out = hsl_adjust([0.3f32, 0.6, 0.2], 0.5, 0.5, 0.5);
        assert_relative_eq!(out[0], 0.3, epsilon = 1e-5);
        assert_relative_eq!(out[1], 0.6, epsilon = 1e-5);
        assert_relative_eq!(out[2], 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_hsl_adjust_hue_rotation() {
        // +120 degrees turns red into green
        let out = hsl_adjust([1.0f32, 0.0, 0.0], 0.5 + 120.0 / 360.0, 0.5, 0.5);
        assert_relative_eq!(out[0], 0.0, epsilon = 1e-4);
        assert_relative_eq!(out[1], 1.0, epsilon = 1e-4);
        assert_relative_eq!(out[2], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_exposure_neutral() {
        // stops 0 (stored 0.5), offset 0 (stored 0.5), gamma 1 (stored 0.1)
        let out = exposure_adjust([0.42f32, 0.1, 0.9], 0.5, 0.5, 0.1);
        assert_relative_eq!(out[0], 0.42, epsilon = 1e-5);
        assert_relative_eq!(out[1], 0.1, epsilon = 1e-5);
        assert_relative_eq!(out[2], 0.9, epsilon = 1e-5);
    }

    #[test]
    fn test_exposure_one_stop_doubles() {
        let out = exposure_adjust([0.25f32, 0.0, 0.0], 0.6, 0.5, 0.1);
        assert_relative_eq!(out[0], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_invert_idempotent() {
        let px = [0.3f32, 0.5, 0.8];
        let twice = invert_adjust(invert_adjust(px));
        assert_relative_eq!(twice[0], px[0]);
        assert_relative_eq!(twice[1], px[1]);
        assert_relative_eq!(twice[2], px[2]);
    }

    #[test]
    fn test_brightness_neutral() {
        let out = brightness_adjust([0.3f32, 0.5, 0.7], 0.5, 0.5);
        assert_relative_eq!(out[0], 0.3, epsilon = 1e-4);
        assert_relative_eq!(out[1], 0.5, epsilon = 1e-4);
        assert_relative_eq!(out[2], 0.7, epsilon = 1e-4);
    }

    #[test]
    fn test_brightness_contrast_pivots_at_midpoint() {
        // raising contrast leaves 0.5 fixed, pushes others apart
        let out = brightness_adjust([0.25f32, 0.5, 0.75], 0.5, 0.75);
        assert_relative_eq!(out[1], 0.5, epsilon = 1e-4);
        assert!(out[0] < 0.25);
        assert!(out[2] > 0.75);
    }

    #[test]
    fn test_overwrite_color_full_alpha() {
        let out = overwrite_color_adjust([0.1f32, 0.2, 0.3], [0.9, 0.8, 0.7], 1.0);
        assert_relative_eq!(out[0], 0.9);
        assert_relative_eq!(out[1], 0.8);
        assert_relative_eq!(out[2], 0.7);
    }

    #[test]
    fn test_colorize_keeps_dest_luma() {
        let out = colorize_impl(&[0.5f32, 0.5, 0.5, 1.0, 0.0, 0.0, 1.0]);
        let y = 0.30 * out[0] + 0.59 * out[1] + 0.11 * out[2];
        assert_relative_eq!(y, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_lighter_colorize_picks_brighter() {
        // dark destination loses to a bright solid color
        let out = lighter_colorize_impl(&[0.1f32, 0.1, 0.1, 0.9, 0.9, 0.9, 1.0]);
        assert_relative_eq!(out[0], 0.9);
        // bright destination survives
        let out = lighter_colorize_impl(&[0.9f32, 0.9, 0.9, 0.1, 0.1, 0.1, 1.0]);
        assert_relative_eq!(out[0], 0.9);
    }

    #[test]
    fn test_selective_color_neutral_grid_is_identity() {
        let mut args = vec![0.6f32, 0.3, 0.2];
        args.extend(std::iter::repeat(0.5f32).take(36));
        let out = selective_color_impl(&args);
        assert_relative_eq!(out[0], 0.6, epsilon = 1e-5);
        assert_relative_eq!(out[1], 0.3, epsilon = 1e-5);
        assert_relative_eq!(out[2], 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_selective_color_reds_channel_moves_red_pixel() {
        // push magenta up in the reds band: the relative CMYK adjustment
        // raises magenta ink, pulling green down
        let mut args = vec![0.9f32, 0.1, 0.1];
        let mut grid = vec![0.5f32; 36];
        grid[6 * 4 + 2] = 1.0; // reds / magenta
        args.extend(grid);
        let out = selective_color_impl(&args);
        assert!(out[1] < 0.1, "green should decrease, got {}", out[1]);
        assert_relative_eq!(out[0], 0.9, epsilon = 1e-4);
    }

    #[test]
    fn test_selective_color_neutral_unaffected_by_chromatic_bands() {
        // a pure gray has zero chroma; chromatic band weights are zeroed
        let mut args = vec![0.5f32, 0.5, 0.5];
        let mut grid = vec![0.5f32; 36];
        for color in 0..4 {
            grid[6 * 4 + color] = 1.0; // crank the reds band
        }
        args.extend(grid);
        let out = selective_color_impl(&args);
        assert_relative_eq!(out[0], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_color_balance_neutral() {
        let mut args = vec![0.4f32, 0.5, 0.6];
        args.extend(std::iter::repeat(0.5f32).take(9));
        args.push(1.0); // preserve luma
        let out = color_balance_impl(&args);
        assert_relative_eq!(out[0], 0.4, epsilon = 1e-4);
        assert_relative_eq!(out[1], 0.5, epsilon = 1e-4);
        assert_relative_eq!(out[2], 0.6, epsilon = 1e-4);
    }

    #[test]
    fn test_color_balance_midtone_shift_preserves_luma() {
        let mut args = vec![0.5f32, 0.5, 0.5];
        let mut tones = vec![0.5f32; 9];
        tones[3] = 0.9; // midR up
        args.extend(tones);
        args.push(1.0);
        let out = color_balance_impl(&args);
        let luma_in = 0.5;
        let luma_out = 0.5 * (out.iter().cloned().fold(f32::MIN, f32::max)
            + out.iter().cloned().fold(f32::MAX, f32::min));
        assert_relative_eq!(luma_out, luma_in, epsilon = 1e-3);
        assert!(out[0] > out[2], "red pushed above blue");
    }

    #[test]
    fn test_photo_filter_density_zero_is_identity() {
        let out = photo_filter_impl(&[0.3f32, 0.6, 0.9, 0.0, 1.0, 0.5, 0.1, 0.0]);
        assert_relative_eq!(out[0], 0.3);
        assert_relative_eq!(out[1], 0.6);
        assert_relative_eq!(out[2], 0.9);
    }

    #[test]
    fn test_photo_filter_tints() {
        // warm filter at full density, no luma preservation
        let out = photo_filter_impl(&[0.5f32, 0.5, 0.5, 1.0, 1.0, 0.8, 0.2, 0.0]);
        assert_relative_eq!(out[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(out[1], 0.4, epsilon = 1e-6);
        assert_relative_eq!(out[2], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_gradient_map() {
        use retouch_color::{Gradient, GradientStop, Rgb};
        use std::sync::Arc;
        let g = Gradient::new(vec![
            GradientStop { position: 0.0, color: Rgb::new(0.0, 0.0, 1.0) },
            GradientStop { position: 1.0, color: Rgb::new(1.0, 0.0, 0.0) },
        ])
        .unwrap();
        let gf = GradientFn::new(Arc::new(g), "gradient_test");
        // white maps to the top stop, black to the bottom
        let hi = gradient_map_adjust([1.0f32, 1.0, 1.0], &gf);
        assert_relative_eq!(hi[0], 1.0);
        let lo = gradient_map_adjust([0.0f32, 0.0, 0.0], &gf);
        assert_relative_eq!(lo[2], 1.0);
    }

    #[test]
    fn test_curves_adjust_master_after_channels() {
        use retouch_color::{Curve, Point};
        use std::sync::Arc;
        let inv = Arc::new(
            Curve::new(vec![Point::new(0.0, 1.0), Point::new(1.0, 0.0)]).unwrap(),
        );
        let invert_r = CurveFn::new(Arc::clone(&inv), "curve_r");
        let out = curves_adjust([0.25f32, 0.5, 0.75], Some(&invert_r), None, None, None);
        assert_relative_eq!(out[0], 0.75, epsilon = 1e-5);
        assert_relative_eq!(out[1], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_trace_parity_selective_color() {
        use retouch_expr::{ExprScalar, ExprTrace, Scalar};
        let mut args = vec![0.7f32, 0.4, 0.2];
        let mut grid = vec![0.5f32; 36];
        grid[6 * 4 + 2] = 0.8; // reds / magenta
        args.extend(grid.iter());
        let direct = selective_color_impl(&args);

        let trace = ExprTrace::new();
        let steps: Vec<ExprScalar> = args.iter().map(|&v| trace.constant(v as f64)).collect();
        let out = <ExprScalar as Scalar>::invoke(&SelectiveColorFn, &steps);
        for (i, o) in out.iter().enumerate() {
            trace.register_result(o, format!("c{i}"));
        }
        let traced = trace.eval(&[], &[]).unwrap();
        for i in 0..3 {
            assert_relative_eq!(direct[i] as f64, traced[i], epsilon = 1e-5);
        }
    }
}
