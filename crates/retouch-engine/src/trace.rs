//! Symbolic trace of the composite at a single pixel.
//!
//! [`Compositor::trace_pixel`] replays the exact per-pixel pipeline the
//! renderer uses, but instantiated with the graph-building scalar: layer
//! opacities and adjustment parameters become free parameters (bank A,
//! in precisely the [`context_to_vector`] key order), the layers' pixel
//! samples become fixed inputs (bank B), and the result is an expression
//! graph whose evaluation — or generated source — stands in for the
//! renderer inside an optimizer's cost function.
//!
//! Because the formulas are shared with the renderer, evaluating the
//! trace at the key's values reproduces [`Compositor::render_pixel`] up
//! to the renderer's per-layer 8-bit quantization.

use crate::compositor::{Compositor, FULL_SIZE};
use crate::context::Context;
use crate::error::{EngineError, Result};
use crate::layer::AdjustmentType;
use crate::pipeline::{adjust_pixel, blend_rgba, source_alpha, LayerFns};
use crate::vector::{context_to_vector, ParamKey};
use retouch_expr::{ExprScalar, ExprTrace, Scalar};
use std::collections::HashMap;

/// A built pixel trace plus everything needed to evaluate it.
pub struct PixelTrace {
    /// The expression trace (free bank = optimizer parameters, fixed
    /// bank = layer pixel samples).
    pub trace: ExprTrace,
    /// Positional description of the free bank; identical to the key
    /// [`context_to_vector`] produces for the same context.
    pub key: ParamKey,
    /// Free-bank values at trace-build time (the current parameter
    /// vector).
    pub free: Vec<f64>,
    /// Fixed-bank values: the layer pixel samples at the traced
    /// coordinate.
    pub fixed: Vec<f64>,
}

impl Compositor {
    /// Builds the symbolic composite trace for one full-size pixel.
    ///
    /// # Errors
    ///
    /// Fails when the context has no image layer or the coordinate is
    /// out of bounds.
    pub fn trace_pixel(&self, c: &Context, x: u32, y: u32) -> Result<PixelTrace> {
        let Some((w, h, _, scale)) = self.resolve_render_size(c, FULL_SIZE) else {
            return Err(EngineError::EmptyContext);
        };
        if x >= w || y >= h {
            return Err(EngineError::OutOfBounds {
                x,
                y,
                width: w,
                height: h,
            });
        }

        let (free, key) = context_to_vector(c);
        let trace = ExprTrace::new();

        // Register every free parameter in key order so the trace's bank
        // indices line up with the vector positions.
        let mut params: HashMap<(String, i32, String), ExprScalar> = HashMap::new();
        for entry in &key {
            let (slot, display) = match &entry.selective_color {
                Some(sc) => (
                    format!("sc_{}_{}", sc.channel, sc.color),
                    format!("x_{}_sc_{}_{}", entry.layer_name, sc.channel, sc.color),
                ),
                None => (
                    entry.adjustment_name.clone(),
                    format!("x_{}_{}", entry.layer_name, entry.adjustment_name),
                ),
            };
            let p = trace.free_param(display);
            params.insert(
                (entry.layer_name.clone(), entry.adjustment_type.value(), slot),
                p,
            );
        }

        let mut fixed = Vec::new();
        let mut comp: [ExprScalar; 4] = [
            trace.constant(1.0),
            trace.constant(1.0),
            trace.constant(1.0),
            trace.constant(0.0),
        ];

        for name in c.order() {
            let Some(layer) = c.layer(name) else { continue };
            if !layer.visible {
                continue;
            }

            // resolve the source sample
            let src: [ExprScalar; 4] = if let Some(order) = layer.precomp_order() {
                // trace through nested precompositions by sampling their
                // rendered pixel as a fixed input; sub-layer parameters
                // do not flow into the free bank
                tracing::debug!(layer = %name, "precomp traced as a fixed sample");
                let sub: Vec<String> = order.iter().filter(|n| c.contains(n)).cloned().collect();
                let img = self.render_ordered(c, &sub, w, h, None, scale);
                let px = img.pixel_f32(x, y);
                register_fixed(&trace, &mut fixed, name, px)
            } else if layer.is_adjustment_layer() {
                comp.clone()
            } else {
                let img = layer.image().expect("image layer has an image");
                let (dx, dy) = layer.offset();
                let sx = x as i64 - dx as i64;
                let sy = y as i64 - dy as i64;
                if sx < 0 || sy < 0 || sx >= img.width() as i64 || sy >= img.height() as i64 {
                    [
                        trace.constant(0.0),
                        trace.constant(0.0),
                        trace.constant(0.0),
                        trace.constant(0.0),
                    ]
                } else {
                    let px = img.pixel_f32(sx as u32, sy as u32);
                    register_fixed(&trace, &mut fixed, name, px)
                }
            };

            let fns = LayerFns::for_layer(layer);
            let layer_name = name.clone();
            let params_ref = &params;
            let mut resolve = |ty: AdjustmentType, pname: &str, default: f32| {
                params_ref
                    .get(&(layer_name.clone(), ty.value(), pname.to_string()))
                    .cloned()
                    .unwrap_or_else(|| ExprScalar::from_f32(default))
            };
            let mut resolve_sc = |channel: &str, color: &str| {
                params_ref
                    .get(&(
                        layer_name.clone(),
                        AdjustmentType::SelectiveColor.value(),
                        format!("sc_{channel}_{color}"),
                    ))
                    .cloned()
                    .unwrap_or_else(|| ExprScalar::from_f32(0.5))
            };

            let mut rgb = [src[0].clone(), src[1].clone(), src[2].clone()];
            if layer.has_adjustments() {
                rgb = adjust_pixel(layer, &fns, rgb, &mut resolve, &mut resolve_sc);
            }

            let mask_weight = layer.mask().map(|m| {
                let mx = (x as u64 * m.width() as u64 / w.max(1) as u64) as u32;
                let my = (y as u64 * m.height() as u64 / h.max(1) as u64) as u32;
                let p = m.pixel_f32(
                    mx.min(m.width().saturating_sub(1)),
                    my.min(m.height().saturating_sub(1)),
                );
                trace.constant((retouch_core::luma(p[0], p[1], p[2]) * p[3]) as f64)
            });

            let opacity = params
                .get(&(
                    name.clone(),
                    AdjustmentType::Opacity.value(),
                    "opacity".to_string(),
                ))
                .cloned()
                .unwrap_or_else(|| ExprScalar::from_f32(layer.opacity()));

            let dst_rgb = [comp[0].clone(), comp[1].clone(), comp[2].clone()];
            let ab = source_alpha(
                src[3].clone(),
                opacity,
                mask_weight,
                fns.cond.as_ref(),
                &rgb,
                &dst_rgb,
            );

            comp = blend_rgba(
                layer.mode,
                comp,
                [rgb[0].clone(), rgb[1].clone(), rgb[2].clone(), ab],
            );
        }

        trace.register_result(&comp[0], "R");
        trace.register_result(&comp[1], "G");
        trace.register_result(&comp[2], "B");
        trace.register_result(&comp[3], "A");

        Ok(PixelTrace {
            trace,
            key,
            free,
            fixed,
        })
    }

}

fn register_fixed(
    trace: &ExprTrace,
    fixed: &mut Vec<f64>,
    layer: &str,
    px: [f32; 4],
) -> [ExprScalar; 4] {
    let channels = ["r", "g", "b", "a"];
    let mut out = Vec::with_capacity(4);
    for (i, ch) in channels.iter().enumerate() {
        out.push(trace.fixed_param(format!("{layer}_{ch}")));
        fixed.push(px[i] as f64);
    }
    [
        out[0].clone(),
        out[1].clone(),
        out[2].clone(),
        out[3].clone(),
    ]
}
