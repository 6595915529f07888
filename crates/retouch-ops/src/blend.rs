//! Blend-mode channel functions.
//!
//! Unless noted otherwise a function takes premultiplied channel values
//! `(dca, sca)` plus the raw alphas `(da, sa)` — `d*` is the destination
//! (the composite so far), `s*` the source layer being blended on top.
//! Linear Burn and Linear Light are the exceptions: they operate on
//! unpremultiplied channels. The caller un-premultiplies afterwards via
//! [`cvt_impl`] (`cvtT`), which maps zero output alpha to 0 rather than
//! NaN.
//!
//! Branch-free formulas (normal, multiply, screen, linear dodge) are
//! plain [`Scalar`] functions and trace as raw arithmetic. Everything
//! that branches is a primitive-catalog entry so symbolic traces record a
//! named call; the bodies are written once over [`Real`] and instantiated
//! at both float widths.

use retouch_expr::{primitive_fn, Real, Scalar};
use retouch_color::{hsy_to_rgb, rgb_to_hsy};

/// Normal (source-over) blend: `Sca + Dca * (1 - Sa)`.
#[inline]
pub fn normal<S: Scalar>(dca: S, sca: S, _da: S, sa: S) -> S {
    sca + dca * (S::from_f32(1.0) - sa)
}

/// Multiply blend: `Sca*Dca + Sca*(1 - Da) + Dca*(1 - Sa)`.
#[inline]
pub fn multiply<S: Scalar>(dca: S, sca: S, da: S, sa: S) -> S {
    let one = S::from_f32(1.0);
    sca.clone() * dca.clone() + sca * (one.clone() - da) + dca * (one - sa)
}

/// Screen blend: `Sca + Dca - Sca*Dca`.
#[inline]
pub fn screen<S: Scalar>(dca: S, sca: S, _da: S, _sa: S) -> S {
    sca.clone() + dca.clone() - sca * dca
}

/// Linear Dodge color channel: `Sca + Dca`.
///
/// The output alpha for this mode is NOT the usual alpha-over value; the
/// compositor must use [`LinearDodgeAlphaFn`] (`min(1, Da + Sa)`) instead.
#[inline]
pub fn linear_dodge<S: Scalar>(dca: S, sca: S, _da: S, _sa: S) -> S {
    sca + dca
}

/// Un-premultiply with zero-alpha recovery: `clamp(c / a, 0, 1)`, 0 when
/// `a == 0`.
pub fn cvt_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (c, a) = (args[0], args[1]);
    if a == T::from_f32(0.0) {
        return vec![T::from_f32(0.0)];
    }
    vec![(c / a).clamp_to(T::from_f32(0.0), T::from_f32(1.0))]
}

/// `clamp(x, lo, hi)`.
pub fn clamp_impl<T: Real>(args: &[T]) -> Vec<T> {
    vec![args[0].clamp_to(args[1], args[2])]
}

/// Linear Dodge's special alpha: `min(1, Da + Sa)`.
pub fn linear_dodge_alpha_impl<T: Real>(args: &[T]) -> Vec<T> {
    let sum = args[0] + args[1];
    let one = T::from_f32(1.0);
    vec![if sum > one { one } else { sum }]
}

/// Overlay; branches on the destination: `2*Dca <= Da`.
pub fn overlay_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (a, b, alpha1, alpha2) = (args[0], args[1], args[2], args[3]);
    let one = T::from_f32(1.0);
    let two = T::from_f32(2.0);
    let v = if two * a <= alpha1 {
        b * a * two + b * (one - alpha1) + a * (one - alpha2)
    } else {
        b * (one + alpha1) + a * (one + alpha2) - two * a * b - alpha1 * alpha2
    };
    vec![v]
}

/// Hard Light; the same piecewise pair as overlay but branching on the
/// source: `2*Sca <= Sa`.
pub fn hard_light_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (a, b, alpha1, alpha2) = (args[0], args[1], args[2], args[3]);
    let one = T::from_f32(1.0);
    let two = T::from_f32(2.0);
    let v = if two * b <= alpha2 {
        two * b * a + b * (one - alpha1) + a * (one - alpha2)
    } else {
        b * (one + alpha1) + a * (one + alpha2) - alpha1 * alpha2 - two * a * b
    };
    vec![v]
}

/// Soft Light, W3C four-way form over the luma ratio `m = Dca/Da`
/// (`m = 0` when `Da = 0`). The final arm is unreachable given the three
/// conditions but falls back to Normal, as the reference does.
pub fn soft_light_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (dca, sca, da, sa) = (args[0], args[1], args[2], args[3]);
    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);
    let two = T::from_f32(2.0);
    let four = T::from_f32(4.0);

    let m = if da == zero { zero } else { dca / da };

    let v = if two * sca <= sa {
        dca * (sa + (two * sca - sa) * (one - m)) + sca * (one - da) + dca * (one - sa)
    } else if two * sca > sa && four * dca <= da {
        let poly = T::from_f32(16.0) * m * m * m - T::from_f32(12.0) * m * m - T::from_f32(3.0) * m;
        da * (two * sca - sa) * poly + sca - sca * da + dca
    } else if two * sca > sa && four * dca > da {
        da * (two * sca - sa) * (m.sqrt() - m) + sca - sca * da + dca
    } else {
        sca + dca * (one - sa)
    };
    vec![v]
}

/// Color Dodge, three-way split on `Sca` vs `Sa`.
pub fn color_dodge_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (dca, sca, da, sa) = (args[0], args[1], args[2], args[3]);
    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);

    let v = if sca == sa && dca == zero {
        sca * (one - da)
    } else if sca == sa {
        sa * da + sca * (one - da) + dca * (one - sa)
    } else if sca < sa {
        sa * da * one.min(dca / da * sa / (sa - sca)) + sca * (one - da) + dca * (one - sa)
    } else {
        // Sca > Sa is unhandled upstream; keep the 0 sentinel rather than
        // inventing behavior for a branch that never fires in practice.
        zero
    };
    vec![v]
}

/// Linear Burn over unpremultiplied channels; `Da == 0` passes the source
/// through.
pub fn linear_burn_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (dc, sc, da, sa) = (args[0], args[1], args[2], args[3]);
    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);

    if da == zero {
        return vec![sc];
    }
    let burn = dc + sc - one;
    vec![burn * sa + dc * (one - sa)]
}

/// Linear Light over unpremultiplied channels; `Da == 0` passes the
/// source through.
pub fn linear_light_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (dc, sc, da, sa) = (args[0], args[1], args[2], args[3]);
    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);
    let two = T::from_f32(2.0);

    if da == zero {
        return vec![sc];
    }
    let light = dc + two * sc - one;
    vec![light * sa + dc * (one - sa)]
}

/// Lighten: per-channel comparison of premultiplied values.
pub fn lighten_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (dca, sca, da, sa) = (args[0], args[1], args[2], args[3]);
    let one = T::from_f32(1.0);
    let v = if sca > dca {
        sca + dca * (one - sa)
    } else {
        dca + sca * (one - da)
    };
    vec![v]
}

/// Darken: the symmetric counterpart of [`lighten_impl`].
pub fn darken_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (dca, sca, da, sa) = (args[0], args[1], args[2], args[3]);
    let one = T::from_f32(1.0);
    let v = if sca > dca {
        dca + sca * (one - da)
    } else {
        sca + dca * (one - sa)
    };
    vec![v]
}

/// Pin Light: `Da == 0` passes the source; otherwise darken with doubled
/// source below 0.5 and lighten with the rescaled source at or above.
pub fn pin_light_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (dca, sca, da, sa) = (args[0], args[1], args[2], args[3]);
    let zero = T::from_f32(0.0);
    let half = T::from_f32(0.5);
    let two = T::from_f32(2.0);

    if da == zero {
        return vec![sca];
    }
    if sca < half {
        darken_impl(&[dca, sca * two, da, sa])
    } else {
        lighten_impl(&[dca, two * (sca - half), da, sa])
    }
}

/// Color blend over unpremultiplied RGB triples: transplants the source
/// hue and chroma onto the destination luma (HSY), then alpha-blends the
/// result over the destination. Args: `[dr, dg, db, sr, sg, sb, Da, Sa]`.
pub fn color_impl<T: Real>(args: &[T]) -> Vec<T> {
    let (dr, dg, db) = (args[0], args[1], args[2]);
    let (sr, sg, sb) = (args[3], args[4], args[5]);
    let (da, sa) = (args[6], args[7]);
    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);

    if da == zero {
        return vec![sr * sa, sg * sa, sb * sa];
    }
    if sa == zero {
        return vec![dr * da, dg * da, db * da];
    }

    // keep dest luma, take source hue and chroma
    let mut dc = rgb_to_hsy(dr, dg, db);
    let sc = rgb_to_hsy(sr, sg, sb);
    dc.h = sc.h;
    dc.s = sc.s;
    let res = hsy_to_rgb(dc.h, dc.s, dc.y);

    vec![
        res.r * sa + dr * da * (one - sa),
        res.g * sa + dg * da * (one - sa),
        res.b * sa + db * da * (one - sa),
    ]
}

/// Color Burn over unpremultiplied channels: `1 - (1 - Dc)/Sc` floored at
/// 0, with `Sc == 0` mapping to 0. Internal helper; not a selectable
/// top-level mode.
pub fn color_burn<T: Real>(dc: T, sc: T) -> T {
    let zero = T::from_f32(0.0);
    let one = T::from_f32(1.0);
    if sc == zero {
        return zero;
    }
    (one - (one - dc) / sc).max(zero)
}

/// Color Dodge over unpremultiplied channels, companion to
/// [`color_burn`].
fn color_dodge_u<T: Real>(dc: T, sc: T) -> T {
    let one = T::from_f32(1.0);
    if sc == one {
        return one;
    }
    (dc / (one - sc)).min(one)
}

/// Vivid Light: color burn below the 0.5 split, color dodge at or above.
/// Internal helper; not a selectable top-level mode.
pub fn vivid_light<T: Real>(dc: T, sc: T) -> T {
    let half = T::from_f32(0.5);
    let two = T::from_f32(2.0);
    if sc < half {
        color_burn(dc, two * sc)
    } else {
        color_dodge_u(dc, two * (sc - half))
    }
}

primitive_fn!(pub CvtFn, "cvtT", 2, 1, cvt_impl);
primitive_fn!(pub ClampFn, "clamp", 3, 1, clamp_impl);
primitive_fn!(pub LinearDodgeAlphaFn, "linearDodgeAlpha", 2, 1, linear_dodge_alpha_impl);
primitive_fn!(pub OverlayFn, "overlay", 4, 1, overlay_impl);
primitive_fn!(pub HardLightFn, "hardLight", 4, 1, hard_light_impl);
primitive_fn!(pub SoftLightFn, "softLight", 4, 1, soft_light_impl);
primitive_fn!(pub ColorDodgeFn, "colorDodge", 4, 1, color_dodge_impl);
primitive_fn!(pub LinearBurnFn, "linearBurn", 4, 1, linear_burn_impl);
primitive_fn!(pub LinearLightFn, "linearLight", 4, 1, linear_light_impl);
primitive_fn!(pub LightenFn, "lighten", 4, 1, lighten_impl);
primitive_fn!(pub DarkenFn, "darken", 4, 1, darken_impl);
primitive_fn!(pub PinLightFn, "pinLight", 4, 1, pin_light_impl);
primitive_fn!(pub ColorBlendFn, "color", 8, 3, color_impl);

/// Convenience: clamp a scalar into `[0, 1]` through the catalog entry.
#[inline]
pub fn clamp01<S: Scalar>(v: S) -> S {
    S::invoke(&ClampFn, &[v, S::from_f32(0.0), S::from_f32(1.0)]).remove(0)
}

/// Convenience: un-premultiply through the catalog entry.
#[inline]
pub fn cvt<S: Scalar>(c: S, a: S) -> S {
    S::invoke(&CvtFn, &[c, a]).remove(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Every blend body must stay finite when either alpha collapses to 0.
    #[test]
    fn test_alpha_zero_is_finite_everywhere() {
        let grid = [0.0f32, 0.25, 0.5, 0.75, 1.0];
        let branchy: [fn(&[f32]) -> Vec<f32>; 9] = [
            overlay_impl,
            hard_light_impl,
            soft_light_impl,
            color_dodge_impl,
            linear_burn_impl,
            linear_light_impl,
            lighten_impl,
            darken_impl,
            pin_light_impl,
        ];
        for f in branchy {
            for &d in &grid {
                for &s in &grid {
                    for &(da, sa) in &[(0.0f32, 0.0f32), (0.0, 1.0), (1.0, 0.0)] {
                        let v = f(&[d * da, s * sa, da, sa]);
                        assert!(v[0].is_finite(), "non-finite at d={d} s={s} da={da} sa={sa}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_normal_opaque_source_wins() {
        // A over B with A opaque: result is A's channel.
        let v = normal(0.3f32, 0.9, 1.0, 1.0);
        assert_relative_eq!(v, 0.9);
    }

    #[test]
    fn test_multiply_opaque() {
        // both opaque: Sca*Dca
        let v = multiply(0.5f32, 0.4, 1.0, 1.0);
        assert_relative_eq!(v, 0.2);
    }

    #[test]
    fn test_screen_symmetry() {
        let a = screen(0.3f32, 0.7, 1.0, 1.0);
        let b = screen(0.7f32, 0.3, 1.0, 1.0);
        assert_relative_eq!(a, b);
        assert_relative_eq!(a, 0.3 + 0.7 - 0.21);
    }

    #[test]
    fn test_cvt_zero_alpha_yields_zero() {
        assert_eq!(cvt_impl(&[0.5f32, 0.0]), vec![0.0]);
        assert_eq!(cvt_impl(&[0.25f32, 0.5]), vec![0.5]);
        // clamps overflow
        assert_eq!(cvt_impl(&[2.0f32, 1.0]), vec![1.0]);
    }

    #[test]
    fn test_linear_dodge_alpha_override() {
        assert_eq!(linear_dodge_alpha_impl(&[0.7f32, 0.7]), vec![1.0]);
        assert_relative_eq!(linear_dodge_alpha_impl(&[0.25f32, 0.5])[0], 0.75);
    }

    #[test]
    fn test_overlay_branches() {
        // dark destination doubles, light destination screens
        let dark = overlay_impl(&[0.2f32, 0.5, 1.0, 1.0])[0];
        assert_relative_eq!(dark, 0.5 * 0.2 * 2.0, epsilon = 1e-6);
        let light = overlay_impl(&[0.8f32, 0.5, 1.0, 1.0])[0];
        assert_relative_eq!(light, 0.5 * 2.0 + 0.8 * 2.0 - 1.0 - 2.0 * 0.8 * 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_hard_light_is_overlay_with_swapped_roles() {
        // hardLight(d, s) branches on s the way overlay branches on d
        let hl = hard_light_impl(&[0.8f32, 0.2, 1.0, 1.0])[0];
        let ov = overlay_impl(&[0.2f32, 0.8, 1.0, 1.0])[0];
        assert_relative_eq!(hl, ov, epsilon = 1e-6);
    }

    #[test]
    fn test_soft_light_neutral_gray() {
        // 50% source leaves an opaque destination unchanged
        for &d in &[0.1f32, 0.4, 0.9] {
            let v = soft_light_impl(&[d, 0.5, 1.0, 1.0])[0];
            assert_relative_eq!(v, d, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_color_dodge_unhandled_branch_sentinel() {
        // Sca > Sa returns the 0 sentinel
        assert_eq!(color_dodge_impl(&[0.5f32, 0.8, 1.0, 0.5]), vec![0.0]);
    }

    #[test]
    fn test_linear_burn_da_zero_passthrough() {
        assert_eq!(linear_burn_impl(&[0.4f32, 0.7, 0.0, 1.0]), vec![0.7]);
        // opaque case: Dc + Sc - 1
        assert_relative_eq!(linear_burn_impl(&[0.4f32, 0.7, 1.0, 1.0])[0], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_linear_light_formula() {
        assert_eq!(linear_light_impl(&[0.5f32, 0.9, 0.0, 1.0]), vec![0.9]);
        assert_relative_eq!(
            linear_light_impl(&[0.5f32, 0.75, 1.0, 1.0])[0],
            0.5 + 1.5 - 1.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_lighten_darken_are_symmetric() {
        let args = [0.3f32, 0.6, 0.8, 0.9];
        let l = lighten_impl(&args)[0];
        let d = darken_impl(&args)[0];
        // lighten picked the source arm, darken the dest arm
        assert_relative_eq!(l, 0.6 + 0.3 * (1.0 - 0.9));
        assert_relative_eq!(d, 0.3 + 0.6 * (1.0 - 0.8));
    }

    #[test]
    fn test_pin_light_delegates() {
        let lo = pin_light_impl(&[0.5f32, 0.2, 1.0, 1.0])[0];
        assert_relative_eq!(lo, darken_impl(&[0.5, 0.4, 1.0, 1.0])[0]);
        let hi = pin_light_impl(&[0.5f32, 0.8, 1.0, 1.0])[0];
        assert_relative_eq!(hi, lighten_impl(&[0.5, 0.6, 1.0, 1.0])[0]);
        assert_eq!(pin_light_impl(&[0.5f32, 0.8, 0.0, 1.0]), vec![0.8]);
    }

    #[test]
    fn test_color_blend_keeps_dest_luma() {
        // opaque red source over opaque gray dest: result luma ~ dest luma
        let out = color_impl(&[0.5f32, 0.5, 0.5, 1.0, 0.0, 0.0, 1.0, 1.0]);
        let luma = 0.30 * out[0] + 0.59 * out[1] + 0.11 * out[2];
        assert_relative_eq!(luma, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_color_blend_degenerate_alphas() {
        let src_only = color_impl(&[0.5f32, 0.5, 0.5, 0.8, 0.6, 0.4, 0.0, 0.5]);
        assert_relative_eq!(src_only[0], 0.4);
        let dst_only = color_impl(&[0.5f32, 0.4, 0.3, 0.8, 0.6, 0.4, 0.5, 0.0]);
        assert_relative_eq!(dst_only[0], 0.25);
    }

    #[test]
    fn test_color_burn_and_vivid_light() {
        assert_eq!(color_burn(0.5f32, 0.0), 0.0);
        assert_relative_eq!(color_burn(0.75f32, 0.5), 0.5);
        // vivid light at s=0.5 switches to dodge of 0
        assert_relative_eq!(vivid_light(0.3f32, 0.5), 0.3);
        assert_relative_eq!(vivid_light(0.3f32, 0.25), color_burn(0.3, 0.5));
    }

    #[test]
    fn test_dual_mode_parity_overlay() {
        use retouch_expr::{ExprScalar, ExprTrace, Scalar};
        let args = [0.3f32, 0.6, 0.8, 0.9];
        let direct = overlay_impl(&args)[0];

        let trace = ExprTrace::new();
        let steps: Vec<ExprScalar> = args.iter().map(|&v| trace.constant(v as f64)).collect();
        let out = <ExprScalar as Scalar>::invoke(&OverlayFn, &steps);
        trace.register_result(&out[0], "v");
        let traced = trace.eval(&[], &[]).unwrap()[0];
        assert_relative_eq!(direct as f64, traced, epsilon = 1e-6);
    }
}
