//! The generic per-pixel pipeline.
//!
//! Everything here is written against [`Scalar`], and this is the single
//! definition of the engine's pixel math: the f32 instantiation renders
//! (both the buffer renderer and `render_pixel`), the
//! [`ExprScalar`](retouch_expr::ExprScalar) instantiation builds optimizer
//! traces. Keeping one code path is what guarantees the two modes cannot
//! drift apart.

use crate::layer::{AdjustmentType, BlendMode, Layer};
use retouch_color::{CurveFn, GradientFn};
use retouch_expr::{PrimitiveFn, Scalar};
use retouch_ops::{
    blend, brightness_adjust, color_balance_adjust, colorize_adjust, curves_adjust, cvt,
    exposure_adjust, gradient_map_adjust, hsl_adjust, invert_adjust, levels_adjust,
    lighter_colorize_adjust, overwrite_color_adjust, photo_filter_adjust, selective_color_adjust,
    ColorBlendFn, ColorDodgeFn, CondBlendFn, DarkenFn, HardLightFn, LightenFn, LinearBurnFn,
    LinearDodgeAlphaFn, LinearLightFn, OverlayFn, PinLightFn, SoftLightFn,
    SELECTIVE_COLOR_CHANNELS, SELECTIVE_COLOR_COLORS,
};

/// Per-layer primitive instances built once per layer per render or
/// trace: the data-carrying catalog entries (curves, gradient,
/// conditional blend) under stable trace-visible names.
pub(crate) struct LayerFns {
    pub curve_r: Option<CurveFn>,
    pub curve_g: Option<CurveFn>,
    pub curve_b: Option<CurveFn>,
    pub curve_rgb: Option<CurveFn>,
    pub gradient: Option<GradientFn>,
    pub cond: Option<CondBlendFn>,
}

impl LayerFns {
    pub fn for_layer(layer: &Layer) -> Self {
        let name = layer.name();
        let curve = |ch: &str| {
            layer
                .curve(ch)
                .map(|c| CurveFn::new(c.clone(), format!("curve_{name}_{ch}")))
        };
        Self {
            curve_r: curve("r"),
            curve_g: curve("g"),
            curve_b: curve("b"),
            curve_rgb: curve("rgb"),
            gradient: layer
                .gradient()
                .map(|g| GradientFn::new(g.clone(), format!("gradient_{name}"))),
            cond: layer
                .conditional_blend()
                .filter(|c| !c.is_pass_through())
                .map(|c| CondBlendFn::new(*c, format!("condBlend_{name}"))),
        }
    }
}

/// Parameter resolver: maps `(adjustment, name, neutral default)` to a
/// scalar. The renderer reads the layer's stored value; the trace builder
/// hands back registered free parameters.
pub(crate) type Resolve<'a, S> = dyn FnMut(AdjustmentType, &str, f32) -> S + 'a;

/// Selective-color grid resolver, `(channel, color)` to a scalar.
pub(crate) type ResolveSc<'a, S> = dyn FnMut(&str, &str) -> S + 'a;

/// A resolver pair reading stored layer values (the rendering mode).
pub(crate) fn stored_resolvers<'a, S: Scalar>(
    layer: &'a Layer,
) -> (
    impl FnMut(AdjustmentType, &str, f32) -> S + 'a,
    impl FnMut(&str, &str) -> S + 'a,
) {
    (
        move |ty, name, default| {
            S::from_f32(layer.adjustment_value(ty, name).unwrap_or(default))
        },
        move |channel, color| S::from_f32(layer.selective_color_channel(channel, color)),
    )
}

/// Applies the layer's ordered adjustment stack to one pixel's RGB.
///
/// Adjustments with an empty parameter map are skipped as inactive,
/// except the structural-data kinds (curves, gradient, selective color)
/// whose activity is their presence.
pub(crate) fn adjust_pixel<S: Scalar>(
    layer: &Layer,
    fns: &LayerFns,
    mut rgb: [S; 3],
    resolve: &mut Resolve<'_, S>,
    resolve_sc: &mut ResolveSc<'_, S>,
) -> [S; 3] {
    for (ty, params) in layer.adjustments() {
        let structural = matches!(
            ty,
            AdjustmentType::Curves | AdjustmentType::Gradient | AdjustmentType::SelectiveColor
        );
        if params.is_empty() && !structural {
            continue;
        }

        rgb = match ty {
            AdjustmentType::Hsl => hsl_adjust(
                rgb,
                resolve(ty, "hue", 0.5),
                resolve(ty, "sat", 0.5),
                resolve(ty, "light", 0.5),
            ),
            AdjustmentType::Levels => levels_adjust(
                rgb,
                resolve(ty, "inMin", 0.0),
                resolve(ty, "inMax", 1.0),
                resolve(ty, "gamma", 0.1),
                resolve(ty, "outMin", 0.0),
                resolve(ty, "outMax", 1.0),
            ),
            AdjustmentType::Curves => curves_adjust(
                rgb,
                fns.curve_r.as_ref(),
                fns.curve_g.as_ref(),
                fns.curve_b.as_ref(),
                fns.curve_rgb.as_ref(),
            ),
            AdjustmentType::Exposure => exposure_adjust(
                rgb,
                resolve(ty, "exposure", 0.5),
                resolve(ty, "offset", 0.5),
                resolve(ty, "gamma", 0.1),
            ),
            AdjustmentType::Gradient => match &fns.gradient {
                Some(g) => gradient_map_adjust(rgb, g),
                None => rgb,
            },
            AdjustmentType::SelectiveColor => {
                let mut grid = Vec::with_capacity(36);
                for channel in SELECTIVE_COLOR_CHANNELS {
                    for color in SELECTIVE_COLOR_COLORS {
                        grid.push(resolve_sc(channel, color));
                    }
                }
                selective_color_adjust(rgb, &grid)
            }
            AdjustmentType::ColorBalance => {
                let tones = [
                    resolve(ty, "shadowR", 0.5),
                    resolve(ty, "shadowG", 0.5),
                    resolve(ty, "shadowB", 0.5),
                    resolve(ty, "midR", 0.5),
                    resolve(ty, "midG", 0.5),
                    resolve(ty, "midB", 0.5),
                    resolve(ty, "highR", 0.5),
                    resolve(ty, "highG", 0.5),
                    resolve(ty, "highB", 0.5),
                ];
                color_balance_adjust(rgb, &tones, resolve(ty, "preserveLuma", 1.0))
            }
            AdjustmentType::PhotoFilter => photo_filter_adjust(
                rgb,
                resolve(ty, "density", 1.0),
                [
                    resolve(ty, "r", 1.0),
                    resolve(ty, "g", 1.0),
                    resolve(ty, "b", 1.0),
                ],
                resolve(ty, "preserveLuma", 1.0),
            ),
            AdjustmentType::Colorize => colorize_adjust(
                rgb,
                [
                    resolve(ty, "r", 0.5),
                    resolve(ty, "g", 0.5),
                    resolve(ty, "b", 0.5),
                ],
                resolve(ty, "a", 1.0),
            ),
            AdjustmentType::LighterColorize => lighter_colorize_adjust(
                rgb,
                [
                    resolve(ty, "r", 0.5),
                    resolve(ty, "g", 0.5),
                    resolve(ty, "b", 0.5),
                ],
                resolve(ty, "a", 1.0),
            ),
            AdjustmentType::OverwriteColor => overwrite_color_adjust(
                rgb,
                [
                    resolve(ty, "r", 0.5),
                    resolve(ty, "g", 0.5),
                    resolve(ty, "b", 0.5),
                ],
                resolve(ty, "a", 1.0),
            ),
            AdjustmentType::Invert => invert_adjust(rgb),
            AdjustmentType::Brightness => brightness_adjust(
                rgb,
                resolve(ty, "brightness", 0.5),
                resolve(ty, "contrast", 0.5),
            ),
            // never stored on a layer
            AdjustmentType::Opacity => rgb,
        };
    }
    rgb
}

/// Effective source alpha: raw source alpha scaled by layer opacity, the
/// mask weight (when present) and the conditional-blend gate.
pub(crate) fn source_alpha<S: Scalar>(
    src_a: S,
    opacity: S,
    mask_weight: Option<S>,
    cond: Option<&CondBlendFn>,
    src_rgb: &[S; 3],
    dst_rgb: &[S; 3],
) -> S {
    let mut ab = src_a * opacity;
    if let Some(w) = mask_weight {
        ab = ab * w;
    }
    if let Some(cond) = cond {
        let scale = S::invoke(
            cond,
            &[
                src_rgb[0].clone(),
                src_rgb[1].clone(),
                src_rgb[2].clone(),
                dst_rgb[0].clone(),
                dst_rgb[1].clone(),
                dst_rgb[2].clone(),
            ],
        )
        .remove(0);
        ab = ab * scale;
    }
    ab
}

fn prim4<S: Scalar, F: PrimitiveFn + Clone + 'static>(
    f: &F,
    d: &[S; 3],
    s: &[S; 3],
    aa: &S,
    ab: &S,
) -> [S; 3] {
    [0, 1, 2].map(|i| {
        S::invoke(f, &[d[i].clone(), s[i].clone(), aa.clone(), ab.clone()]).remove(0)
    })
}

/// Blends one source pixel over the destination.
///
/// `dst` and `src` are straight (unpremultiplied) RGB plus alpha; the
/// premultiply, the per-mode channel formula, the un-premultiply via
/// `cvtT`, and the Linear Dodge alpha special case all happen here.
pub(crate) fn blend_rgba<S: Scalar>(mode: BlendMode, dst: [S; 4], src: [S; 4]) -> [S; 4] {
    let [dr, dg, db, aa] = dst;
    let [sr, sg, sb, ab] = src;

    // Linear Dodge overrides the usual alpha-over at the dispatch level.
    let ad = match mode {
        BlendMode::LinearDodge => {
            S::invoke(&LinearDodgeAlphaFn, &[aa.clone(), ab.clone()]).remove(0)
        }
        _ => aa.clone() + ab.clone() - aa.clone() * ab.clone(),
    };

    let d = [dr.clone(), dg.clone(), db.clone()];
    let s = [sr.clone(), sg.clone(), sb.clone()];
    let dp = [
        dr.clone() * aa.clone(),
        dg.clone() * aa.clone(),
        db.clone() * aa.clone(),
    ];
    let sp = [
        sr.clone() * ab.clone(),
        sg.clone() * ab.clone(),
        sb.clone() * ab.clone(),
    ];

    let channels: [S; 3] = match mode {
        BlendMode::Normal => [0, 1, 2].map(|i| {
            blend::normal(dp[i].clone(), sp[i].clone(), aa.clone(), ab.clone())
        }),
        BlendMode::Multiply => [0, 1, 2].map(|i| {
            blend::multiply(dp[i].clone(), sp[i].clone(), aa.clone(), ab.clone())
        }),
        BlendMode::Screen => [0, 1, 2].map(|i| {
            blend::screen(dp[i].clone(), sp[i].clone(), aa.clone(), ab.clone())
        }),
        BlendMode::LinearDodge => [0, 1, 2].map(|i| {
            blend::linear_dodge(dp[i].clone(), sp[i].clone(), aa.clone(), ab.clone())
        }),
        BlendMode::Overlay => prim4(&OverlayFn, &dp, &sp, &aa, &ab),
        BlendMode::HardLight => prim4(&HardLightFn, &dp, &sp, &aa, &ab),
        BlendMode::SoftLight => prim4(&SoftLightFn, &dp, &sp, &aa, &ab),
        BlendMode::ColorDodge => prim4(&ColorDodgeFn, &dp, &sp, &aa, &ab),
        BlendMode::Lighten => prim4(&LightenFn, &dp, &sp, &aa, &ab),
        BlendMode::Darken => prim4(&DarkenFn, &dp, &sp, &aa, &ab),
        BlendMode::PinLight => prim4(&PinLightFn, &dp, &sp, &aa, &ab),
        // these two operate on unpremultiplied channels
        BlendMode::LinearBurn => prim4(&LinearBurnFn, &d, &s, &aa, &ab),
        BlendMode::LinearLight => prim4(&LinearLightFn, &d, &s, &aa, &ab),
        BlendMode::Color => {
            let out = S::invoke(
                &ColorBlendFn,
                &[
                    d[0].clone(),
                    d[1].clone(),
                    d[2].clone(),
                    s[0].clone(),
                    s[1].clone(),
                    s[2].clone(),
                    aa.clone(),
                    ab.clone(),
                ],
            );
            let [r, g, b]: [S; 3] = out.try_into().ok().expect("color blend returns 3");
            [r, g, b]
        }
    };

    let [r, g, b] = channels;
    [
        cvt(r, ad.clone()),
        cvt(g, ad.clone()),
        cvt(b, ad.clone()),
        ad,
    ]
}
