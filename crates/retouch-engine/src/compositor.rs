//! The compositor: layer management, scaled-variant caching, and the
//! render pipeline.
//!
//! Rendering walks the context's order list bottom-to-top over a canvas
//! initialized to white with zero alpha (Photoshop's internal compositing
//! convention). Per layer the pixel source is resolved (the layer's own
//! image, a precomposition render, or — for a true adjustment layer — the
//! composite so far), the adjustment stack is applied, and the source is
//! blended over the running composite with the layer's mode and opacity.
//!
//! All pixel math runs through the shared generic pipeline
//! (`pipeline.rs`); the composite is quantized to RGBA8 after each layer.
//! [`Compositor::render_pixel`] follows the identical per-layer,
//! per-pixel steps, so a single pixel of a full render and the pixel
//! entry point agree exactly.
//!
//! Structural misuse (duplicate names, unknown layers, bad indices,
//! unknown size tags) is reported by a `false`/fallback return plus a
//! `tracing` diagnostic; state is never left half-modified.

use crate::context::Context;
use crate::layer::Layer;
use crate::pipeline::{adjust_pixel, blend_rgba, source_alpha, stored_resolvers, LayerFns};
use retouch_core::{luma, Image};
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Size tag selecting the full-resolution render.
pub const FULL_SIZE: &str = "full";

enum LayerSource {
    /// Blend source is the composite so far (true adjustment layer).
    Composite,
    /// Blend source is an image (owned handle; pixel data is shared).
    Image(Image),
}

/// Layer-stack owner and renderer.
pub struct Compositor {
    primary: Context,
    cache_sizes: BTreeMap<String, f32>,
    scaled: HashMap<String, HashMap<String, Image>>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    /// Creates an empty compositor with the standard scaled-variant sizes
    /// (thumb 0.15, small 0.25, medium 0.5).
    pub fn new() -> Self {
        let mut cache_sizes = BTreeMap::new();
        cache_sizes.insert("thumb".to_string(), 0.15);
        cache_sizes.insert("small".to_string(), 0.25);
        cache_sizes.insert("medium".to_string(), 0.5);
        Self {
            primary: Context::new(),
            cache_sizes,
            scaled: HashMap::new(),
        }
    }

    // --- layer management ----------------------------------------------

    /// Adds an image layer at the top of the stack and caches its scaled
    /// variants. Returns `false` if the name is taken.
    pub fn add_layer(&mut self, name: impl Into<String>, image: Image) -> bool {
        let name = name.into();
        if !self.primary.insert(Layer::new(name.clone(), image)) {
            return false;
        }
        self.cache_scaled(&name);
        tracing::debug!(layer = %name, "added new layer");
        true
    }

    /// Adds an adjustment layer (no image) at the top of the stack.
    pub fn add_adjustment_layer(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        let ok = self.primary.insert(Layer::new_adjustment(name.clone()));
        if ok {
            tracing::debug!(layer = %name, "added adjustment layer");
        }
        ok
    }

    /// Duplicates a layer's settings under a new name; the source image
    /// and scaled variants stay shared.
    pub fn copy_layer(&mut self, src: &str, dest: impl Into<String>) -> bool {
        let dest = dest.into();
        if self.primary.contains(&dest) {
            tracing::warn!(layer = %dest, "failed to copy layer: name already exists");
            return false;
        }
        let Some(source) = self.primary.layer(src) else {
            tracing::warn!(layer = %src, "failed to copy layer: source does not exist");
            return false;
        };

        let mut copy = source.clone();
        copy.set_name(dest.clone());
        self.primary.insert(copy);
        if let Some(cache) = self.scaled.get(src) {
            let cache = cache.clone();
            self.scaled.insert(dest.clone(), cache);
        }
        tracing::debug!(src = %src, dest = %dest, "copied layer");
        true
    }

    /// Removes a layer, its order entry, and its cached variants.
    pub fn delete_layer(&mut self, name: &str) -> bool {
        if !self.primary.remove(name) {
            return false;
        }
        self.scaled.remove(name);
        tracing::debug!(layer = %name, "deleted layer");
        true
    }

    /// Moves a layer within the order list (see [`Context::reorder`]).
    pub fn reorder_layer(&mut self, from: usize, to: usize) -> bool {
        self.primary.reorder(from, to)
    }

    /// Replaces the order list after validation (see
    /// [`Context::set_order`]).
    pub fn set_layer_order(&mut self, order: Vec<String>) -> bool {
        self.primary.set_order(order)
    }

    /// Borrows a layer of the primary context.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.primary.layer(name)
    }

    /// Mutably borrows a layer of the primary context.
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.primary.layer_mut(name)
    }

    /// The compositing order of the primary context.
    pub fn layer_order(&self) -> &[String] {
        self.primary.order()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// `true` when no layers are present.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// A value copy of the primary context for search threads to mutate
    /// independently.
    pub fn new_context(&self) -> Context {
        self.primary.clone()
    }

    /// The primary context.
    pub fn primary_context(&self) -> &Context {
        &self.primary
    }

    /// Mutable access to the primary context.
    pub fn primary_context_mut(&mut self) -> &mut Context {
        &mut self.primary
    }

    // --- scaled-variant cache ------------------------------------------

    /// Registers a named render size and builds the variant for every
    /// image layer. Rejects the reserved `full` tag and non-positive
    /// scales.
    pub fn add_cache_size(&mut self, name: impl Into<String>, scale: f32) -> bool {
        let name = name.into();
        if name == FULL_SIZE || name.is_empty() {
            tracing::warn!(size = %name, "cannot redefine the full-size render");
            return false;
        }
        if !scale.is_finite() || scale <= 0.0 {
            tracing::warn!(size = %name, scale, "rejecting cache size with invalid scale");
            return false;
        }
        self.cache_sizes.insert(name, scale);
        let names: Vec<String> = self.primary.order().to_vec();
        for layer in names {
            self.cache_scaled(&layer);
        }
        true
    }

    /// Drops a named render size and its cached variants.
    pub fn delete_cache_size(&mut self, name: &str) -> bool {
        if self.cache_sizes.remove(name).is_none() {
            tracing::warn!(size = %name, "failed to delete cache size: unknown");
            return false;
        }
        for cache in self.scaled.values_mut() {
            cache.remove(name);
        }
        true
    }

    /// Registered size tags (not including `full`).
    pub fn cache_sizes(&self) -> Vec<String> {
        self.cache_sizes.keys().cloned().collect()
    }

    /// A layer's cached image at a named size.
    pub fn cached_image(&self, layer: &str, size: &str) -> Option<&Image> {
        self.scaled.get(layer).and_then(|m| m.get(size))
    }

    fn cache_scaled(&mut self, name: &str) {
        let Some(image) = self.primary.layer(name).and_then(|l| l.image()).cloned() else {
            return;
        };

        #[cfg(feature = "parallel")]
        let entries: Vec<(String, Image)> = {
            let sizes: Vec<(String, f32)> = self
                .cache_sizes
                .iter()
                .map(|(n, s)| (n.clone(), *s))
                .collect();
            sizes
                .into_par_iter()
                .filter_map(|(size, scale)| image.resize(scale).ok().map(|img| (size, img)))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let entries: Vec<(String, Image)> = self
            .cache_sizes
            .iter()
            .filter_map(|(size, scale)| image.resize(*scale).ok().map(|img| (size.clone(), img)))
            .collect();

        self.scaled.insert(name.to_string(), entries.into_iter().collect());
    }

    // --- rendering ------------------------------------------------------

    /// Renders the primary context at a named size.
    pub fn render_primary(&self, size: &str) -> Image {
        self.render(&self.primary, size)
    }

    /// Renders a context snapshot at a named size (`""` or `"full"` for
    /// full resolution). An unknown size tag falls back to full size with
    /// a warning.
    pub fn render(&self, c: &Context, size: &str) -> Image {
        let Some((w, h, size_key, scale)) = self.resolve_render_size(c, size) else {
            return Image::new(0, 0);
        };
        self.render_ordered(c, c.order(), w, h, size_key.as_deref(), scale)
    }

    /// Renders the stack up to (but not including) the named layer. A
    /// debugging aid for inspecting intermediate composites.
    pub fn render_up_to(&self, c: &Context, stop: &str, size: &str) -> Image {
        let Some((w, h, size_key, scale)) = self.resolve_render_size(c, size) else {
            return Image::new(0, 0);
        };
        let upto: Vec<String> = c
            .order()
            .iter()
            .take_while(|n| n.as_str() != stop)
            .cloned()
            .collect();
        self.render_ordered(c, &upto, w, h, size_key.as_deref(), scale)
    }

    /// Renders a single full-size pixel through the identical per-layer
    /// path as [`Compositor::render`], returning straight normalized
    /// RGBA.
    pub fn render_pixel(&self, c: &Context, x: u32, y: u32) -> [f32; 4] {
        let Some((w, h, _, scale)) = self.resolve_render_size(c, FULL_SIZE) else {
            return [0.0; 4];
        };
        if x >= w || y >= h {
            tracing::warn!(x, y, w, h, "render_pixel out of bounds");
            return [0.0; 4];
        }

        let mut comp: [u8; 4] = [255, 255, 255, 0];
        for name in c.order() {
            let Some(layer) = c.layer(name) else {
                tracing::warn!(layer = %name, "order references unknown layer");
                continue;
            };
            if !layer.visible {
                continue;
            }
            let Some(source) = self.resolve_source(c, layer, None, scale, w, h) else {
                continue;
            };
            let fns = LayerFns::for_layer(layer);
            let (mut resolve, mut resolve_sc) = stored_resolvers::<f32>(layer);

            let dst = [
                comp[0] as f32 / 255.0,
                comp[1] as f32 / 255.0,
                comp[2] as f32 / 255.0,
                comp[3] as f32 / 255.0,
            ];
            let out = layer_pixel(
                layer,
                &fns,
                &source,
                dst,
                x,
                y,
                w,
                h,
                scale,
                &mut resolve,
                &mut resolve_sc,
            );
            comp = out.map(quantize);
        }

        comp.map(|v| v as f32 / 255.0)
    }

    pub(crate) fn render_ordered(
        &self,
        c: &Context,
        order: &[String],
        w: u32,
        h: u32,
        size_key: Option<&str>,
        scale: f32,
    ) -> Image {
        let mut comp = Image::filled(w, h, [255, 255, 255, 0]);

        for name in order {
            let Some(layer) = c.layer(name) else {
                tracing::warn!(layer = %name, "order references unknown layer");
                continue;
            };
            if !layer.visible {
                continue;
            }
            let Some(source) = self.resolve_source(c, layer, size_key, scale, w, h) else {
                continue;
            };
            let fns = LayerFns::for_layer(layer);
            let (mut resolve, mut resolve_sc) = stored_resolvers::<f32>(layer);

            let data = comp.data_mut();
            for i in 0..(w as usize * h as usize) {
                let x = (i % w as usize) as u32;
                let y = (i / w as usize) as u32;
                let o = i * 4;
                let dst = [
                    data[o] as f32 / 255.0,
                    data[o + 1] as f32 / 255.0,
                    data[o + 2] as f32 / 255.0,
                    data[o + 3] as f32 / 255.0,
                ];
                let out = layer_pixel(
                    layer,
                    &fns,
                    &source,
                    dst,
                    x,
                    y,
                    w,
                    h,
                    scale,
                    &mut resolve,
                    &mut resolve_sc,
                );
                data[o] = quantize(out[0]);
                data[o + 1] = quantize(out[1]);
                data[o + 2] = quantize(out[2]);
                data[o + 3] = quantize(out[3]);
            }
        }

        comp
    }

    /// Picks render dimensions plus the cache key and scale for a size
    /// tag. `None` when the context has no image layer to size against.
    pub(crate) fn resolve_render_size(
        &self,
        c: &Context,
        size: &str,
    ) -> Option<(u32, u32, Option<String>, f32)> {
        // size against the first ordered image layer; contexts whose
        // order holds only precomp groups fall back to any image layer
        let (fw, fh) = c
            .layers_in_order()
            .find_map(|l| l.image().map(|i| (i.width(), i.height())))
            .or_else(|| {
                c.layers_by_name()
                    .find_map(|l| l.image().map(|i| (i.width(), i.height())))
            })?;

        if size.is_empty() || size == FULL_SIZE {
            return Some((fw, fh, None, 1.0));
        }
        match self.cache_sizes.get(size) {
            Some(&scale) => {
                let w = ((fw as f32 * scale).round() as u32).max(1);
                let h = ((fh as f32 * scale).round() as u32).max(1);
                Some((w, h, Some(size.to_string()), scale))
            }
            None => {
                tracing::warn!(size = %size, "no render size with this name, rendering at full size");
                Some((fw, fh, None, 1.0))
            }
        }
    }

    /// Resolves the blend source for a layer: the composite so far for a
    /// true adjustment layer, a precomposition render, or the layer's
    /// (possibly cached scaled) image.
    fn resolve_source(
        &self,
        c: &Context,
        layer: &Layer,
        size_key: Option<&str>,
        scale: f32,
        w: u32,
        h: u32,
    ) -> Option<LayerSource> {
        if let Some(order) = layer.precomp_order() {
            for name in order {
                if !c.contains(name) {
                    tracing::warn!(layer = %layer.name(), sub = %name, "precomp references unknown layer");
                }
            }
            let sub: Vec<String> = order.iter().filter(|n| c.contains(n)).cloned().collect();
            return Some(LayerSource::Image(
                self.render_ordered(c, &sub, w, h, size_key, scale),
            ));
        }

        if layer.is_adjustment_layer() {
            return Some(LayerSource::Composite);
        }

        if let Some(size) = size_key {
            if let Some(img) = self.cached_image(layer.name(), size) {
                return Some(LayerSource::Image(img.clone()));
            }
            // cache miss (e.g. layer image replaced after caching): scale
            // on the fly so dimensions stay consistent
            tracing::debug!(layer = %layer.name(), size, "scaled cache miss, resizing on the fly");
            if let Some(img) = layer.image() {
                return img.resize(scale).ok().map(LayerSource::Image);
            }
        }

        match layer.image() {
            Some(img) => Some(LayerSource::Image(img.clone())),
            None => {
                tracing::warn!(layer = %layer.name(), "layer has no image source, skipping");
                None
            }
        }
    }
}

/// One layer's contribution at one pixel: source lookup (with offset),
/// adjustments, mask/conditional alpha, and the blend itself. Straight
/// normalized RGBA in, straight normalized RGBA out.
#[allow(clippy::too_many_arguments)]
fn layer_pixel(
    layer: &Layer,
    fns: &LayerFns,
    source: &LayerSource,
    dst: [f32; 4],
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    scale: f32,
    resolve: &mut (dyn FnMut(crate::layer::AdjustmentType, &str, f32) -> f32 + '_),
    resolve_sc: &mut (dyn FnMut(&str, &str) -> f32 + '_),
) -> [f32; 4] {
    let src = match source {
        LayerSource::Composite => dst,
        LayerSource::Image(img) => {
            let (dx, dy) = layer.offset();
            let sx = x as i64 - (dx as f32 * scale).round() as i64;
            let sy = y as i64 - (dy as f32 * scale).round() as i64;
            if sx < 0 || sy < 0 || sx >= img.width() as i64 || sy >= img.height() as i64 {
                [0.0, 0.0, 0.0, 0.0]
            } else {
                img.pixel_f32(sx as u32, sy as u32)
            }
        }
    };

    let mut rgb = [src[0], src[1], src[2]];
    if layer.has_adjustments() {
        rgb = adjust_pixel(layer, fns, rgb, resolve, resolve_sc);
    }

    let mask_weight = layer.mask().map(|m| {
        let mx = (x as u64 * m.width() as u64 / w.max(1) as u64) as u32;
        let my = (y as u64 * m.height() as u64 / h.max(1) as u64) as u32;
        let p = m.pixel_f32(mx.min(m.width().saturating_sub(1)), my.min(m.height().saturating_sub(1)));
        luma(p[0], p[1], p[2]) * p[3]
    });

    let dst_rgb = [dst[0], dst[1], dst[2]];
    let ab = source_alpha(
        src[3],
        layer.opacity(),
        mask_weight,
        fns.cond.as_ref(),
        &rgb,
        &dst_rgb,
    );

    blend_rgba(layer.mode, dst, [rgb[0], rgb[1], rgb[2], ab])
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::BlendMode;

    fn solid(r: u8, g: u8, b: u8, a: u8) -> Image {
        Image::filled(2, 2, [r, g, b, a])
    }

    #[test]
    fn test_single_opaque_layer_reproduced() {
        let mut comp = Compositor::new();
        assert!(comp.add_layer("red", solid(255, 0, 0, 255)));
        let out = comp.render_primary(FULL_SIZE);
        assert_eq!(out.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(out.pixel(1, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn test_half_opacity_normal() {
        let mut comp = Compositor::new();
        comp.add_layer("red", solid(255, 0, 0, 255));
        comp.layer_mut("red").unwrap().set_opacity(0.5);
        let out = comp.render_primary(FULL_SIZE);
        let px = out.pixel(0, 0);
        assert!((px[3] as i32 - 128).abs() <= 1, "alpha {}", px[3]);
        assert_eq!(px[0], 255);
        assert_eq!(px[1], 0);
        assert_eq!(px[2], 0);
    }

    #[test]
    fn test_multiply_green_over_blue_is_black() {
        let mut comp = Compositor::new();
        comp.add_layer("blue", solid(0, 0, 255, 255));
        comp.add_layer("green", solid(0, 255, 0, 255));
        comp.layer_mut("green").unwrap().mode = BlendMode::Multiply;
        let out = comp.render_primary(FULL_SIZE);
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_duplicate_layer_rejected_and_state_unchanged() {
        let mut comp = Compositor::new();
        assert!(comp.add_layer("a", solid(10, 10, 10, 255)));
        assert!(!comp.add_layer("a", solid(20, 20, 20, 255)));
        assert_eq!(comp.len(), 1);
        let out = comp.render_primary(FULL_SIZE);
        assert_eq!(out.pixel(0, 0), [10, 10, 10, 255]);
    }

    #[test]
    fn test_unknown_size_falls_back_to_full() {
        let mut comp = Compositor::new();
        comp.add_layer("a", Image::filled(8, 8, [1, 2, 3, 255]));
        let out = comp.render_primary("enormous");
        assert_eq!(out.width(), 8);
        assert_eq!(out.height(), 8);
    }

    #[test]
    fn test_scaled_render_uses_cache_dims() {
        let mut comp = Compositor::new();
        comp.add_layer("a", Image::filled(8, 8, [100, 100, 100, 255]));
        let out = comp.render_primary("medium");
        assert_eq!(out.width(), 4);
        assert_eq!(out.height(), 4);
        assert_eq!(out.pixel(0, 0), [100, 100, 100, 255]);
    }

    #[test]
    fn test_add_and_delete_cache_size() {
        let mut comp = Compositor::new();
        comp.add_layer("a", Image::filled(10, 10, [5, 5, 5, 255]));
        assert!(comp.add_cache_size("tiny", 0.1));
        assert!(comp.cached_image("a", "tiny").is_some());
        let out = comp.render_primary("tiny");
        assert_eq!(out.width(), 1);
        assert!(comp.delete_cache_size("tiny"));
        assert!(!comp.delete_cache_size("tiny"));
        assert!(!comp.add_cache_size(FULL_SIZE, 0.5));
    }

    #[test]
    fn test_adjustment_layer_transforms_composite() {
        let mut comp = Compositor::new();
        comp.add_layer("gray", solid(128, 128, 128, 255));
        comp.add_adjustment_layer("inv");
        comp.layer_mut("inv").unwrap().add_invert_adjustment();
        let out = comp.render_primary(FULL_SIZE);
        let px = out.pixel(0, 0);
        assert!((px[0] as i32 - 127).abs() <= 1);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_image_layer_adjustment_clips_to_layer() {
        // invert on the top layer must not touch the bottom layer's pixels
        let mut comp = Compositor::new();
        comp.add_layer("bg", solid(0, 0, 0, 255));
        comp.add_layer("fg", solid(255, 255, 255, 0)); // fully transparent
        comp.layer_mut("fg").unwrap().add_invert_adjustment();
        let out = comp.render_primary(FULL_SIZE);
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_render_pixel_matches_render() {
        let mut comp = Compositor::new();
        comp.add_layer("base", solid(40, 80, 120, 255));
        comp.add_layer("top", solid(200, 150, 100, 200));
        {
            let top = comp.layer_mut("top").unwrap();
            top.mode = BlendMode::SoftLight;
            top.set_opacity(0.7);
            top.add_hsl_adjustment(0.6, 0.5, 0.45);
        }
        let full = comp.render_primary(FULL_SIZE);
        for (x, y) in [(0u32, 0u32), (1, 1)] {
            let px = comp.render_pixel(comp.primary_context(), x, y);
            let expected = full.pixel(x, y);
            for c in 0..4 {
                assert_eq!((px[c] * 255.0).round() as u8, expected[c], "channel {c}");
            }
        }
    }

    #[test]
    fn test_layer_offset_shifts_source() {
        let mut img = Image::new(2, 2);
        img.set_pixel(0, 0, [255, 0, 0, 255]);
        let mut comp = Compositor::new();
        comp.add_layer("a", img);
        comp.layer_mut("a").unwrap().set_offset(1, 0);
        let out = comp.render_primary(FULL_SIZE);
        // the red pixel moved right; vacated pixel is transparent over
        // the white/alpha-0 canvas
        assert_eq!(out.pixel(1, 0), [255, 0, 0, 255]);
        assert_eq!(out.pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_mask_gates_alpha() {
        let mut mask = Image::filled(2, 2, [255, 255, 255, 255]);
        mask.set_pixel(0, 0, [0, 0, 0, 255]); // black hides
        let mut comp = Compositor::new();
        comp.add_layer("bg", solid(0, 255, 0, 255));
        comp.add_layer("red", solid(255, 0, 0, 255));
        comp.layer_mut("red").unwrap().set_mask(Some(mask));
        let out = comp.render_primary(FULL_SIZE);
        assert_eq!(out.pixel(0, 0), [0, 255, 0, 255]); // masked out
        assert_eq!(out.pixel(1, 1), [255, 0, 0, 255]); // mask passes
    }

    #[test]
    fn test_copy_layer_shares_settings() {
        let mut comp = Compositor::new();
        comp.add_layer("a", solid(9, 9, 9, 255));
        comp.layer_mut("a").unwrap().set_opacity(0.25);
        assert!(comp.copy_layer("a", "b"));
        assert_eq!(comp.layer("b").unwrap().opacity(), 0.25);
        assert_eq!(comp.layer_order(), ["a", "b"]);
        assert!(!comp.copy_layer("a", "b"));
        assert!(!comp.copy_layer("missing", "c"));
    }

    #[test]
    fn test_empty_context_renders_empty_image() {
        let comp = Compositor::new();
        let out = comp.render_primary(FULL_SIZE);
        assert!(out.is_empty());
    }

    #[test]
    fn test_render_up_to_excludes_stop_layer() {
        let mut comp = Compositor::new();
        comp.add_layer("bg", solid(10, 20, 30, 255));
        comp.add_layer("fg", solid(200, 200, 200, 255));
        let out = comp.render_up_to(comp.primary_context(), "fg", FULL_SIZE);
        assert_eq!(out.pixel(0, 0), [10, 20, 30, 255]);
    }

    #[test]
    fn test_precomp_layer_renders_sublayers() {
        let mut comp = Compositor::new();
        comp.add_layer("a", solid(255, 0, 0, 255));
        comp.add_layer("b", solid(0, 255, 0, 255));
        comp.add_adjustment_layer("group");
        comp.layer_mut("group")
            .unwrap()
            .set_precomp_order(Some(vec!["a".into()]));
        // only the group renders at the top level; its sub-layer stays in
        // the context but out of the main order
        assert!(comp.set_layer_order(vec!["group".into()]));
        let out = comp.render_primary(FULL_SIZE);
        assert_eq!(out.pixel(0, 0), [255, 0, 0, 255]);
    }
}
