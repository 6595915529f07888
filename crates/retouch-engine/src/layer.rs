//! Layer: per-layer settings and adjustment storage.
//!
//! A layer is either an *image layer* (it references a source [`Image`])
//! or an *adjustment layer* (no image; its adjustment stack transforms
//! the composite underneath it). Layers are cheap value objects: copying
//! one copies the settings while the pixel buffer stays shared through
//! the image's copy-on-write storage.
//!
//! Adjustments are stored keyed by [`AdjustmentType`] in a `BTreeMap`, so
//! iteration follows the type's numeric order, and parameter names within
//! a type iterate lexicographically. The parameter vector schema depends
//! on exactly this ordering; see the `vector` module.

use retouch_color::{Curve, Gradient};
use retouch_core::Image;
use retouch_ops::ConditionalBlend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Photoshop-style blend mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Standard source-over.
    #[default]
    Normal,
    /// Multiply.
    Multiply,
    /// Screen.
    Screen,
    /// Overlay.
    Overlay,
    /// Hard light.
    HardLight,
    /// Soft light.
    SoftLight,
    /// Linear dodge (add); carries its own alpha rule.
    LinearDodge,
    /// Color dodge.
    ColorDodge,
    /// Linear burn.
    LinearBurn,
    /// Linear light.
    LinearLight,
    /// Color (hue + chroma transplant).
    Color,
    /// Lighten.
    Lighten,
    /// Darken.
    Darken,
    /// Pin light.
    PinLight,
}

/// The closed adjustment enumeration.
///
/// The numeric values fix the canonical ordering of the parameter vector
/// and the integer encoding of the JSON key exchanged with the optimizer.
/// `Opacity` exists only in that flattened representation; it is never
/// stored as a per-layer adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdjustmentType {
    /// Hue/saturation/lightness shift.
    Hsl = 0,
    /// Levels remap.
    Levels = 1,
    /// Per-channel tone curves.
    Curves = 2,
    /// Exposure/offset/gamma.
    Exposure = 3,
    /// Gradient map.
    Gradient = 4,
    /// Selective color.
    SelectiveColor = 5,
    /// Color balance.
    ColorBalance = 6,
    /// Photo filter.
    PhotoFilter = 7,
    /// Colorize.
    Colorize = 8,
    /// Lighter colorize.
    LighterColorize = 9,
    /// Overwrite color.
    OverwriteColor = 10,
    /// Channel inversion.
    Invert = 11,
    /// Brightness/contrast.
    Brightness = 12,
    /// Sentinel for the flattened opacity entry.
    Opacity = 13,
}

impl AdjustmentType {
    /// Integer value used in the JSON key schema.
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Reverse of [`AdjustmentType::value`].
    pub fn from_value(v: i32) -> Option<Self> {
        use AdjustmentType::*;
        Some(match v {
            0 => Hsl,
            1 => Levels,
            2 => Curves,
            3 => Exposure,
            4 => Gradient,
            5 => SelectiveColor,
            6 => ColorBalance,
            7 => PhotoFilter,
            8 => Colorize,
            9 => LighterColorize,
            10 => OverwriteColor,
            11 => Invert,
            12 => Brightness,
            13 => Opacity,
            _ => return None,
        })
    }
}

// The key schema wants the integer enum value, not a name string.
impl Serialize for AdjustmentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.value())
    }
}

impl<'de> Deserialize<'de> for AdjustmentType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = i32::deserialize(deserializer)?;
        AdjustmentType::from_value(v)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown adjustment type {v}")))
    }
}

/// Named parameter map of one adjustment.
pub type ParamMap = BTreeMap<String, f32>;

/// A single layer of the compositing stack.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    /// Blend mode used when compositing this layer.
    pub mode: BlendMode,
    opacity: f32,
    /// Layer visibility; invisible layers are skipped entirely.
    pub visible: bool,
    adjustments: BTreeMap<AdjustmentType, ParamMap>,
    curves: BTreeMap<String, Arc<Curve>>,
    gradient: Option<Arc<Gradient>>,
    selective_color: BTreeMap<String, BTreeMap<String, f32>>,
    sc_relative: bool,
    cond_blend: Option<ConditionalBlend>,
    mask: Option<Image>,
    offset: (i32, i32),
    precomp: Option<Vec<String>>,
    image: Option<Image>,
}

impl Layer {
    /// Creates an image layer.
    pub fn new(name: impl Into<String>, image: Image) -> Self {
        Self::init(name.into(), Some(image))
    }

    /// Creates an adjustment layer (no source image; the adjustment stack
    /// applies to the composite underneath).
    pub fn new_adjustment(name: impl Into<String>) -> Self {
        Self::init(name.into(), None)
    }

    fn init(name: String, image: Option<Image>) -> Self {
        Self {
            name,
            mode: BlendMode::Normal,
            opacity: 1.0,
            visible: true,
            adjustments: BTreeMap::new(),
            curves: BTreeMap::new(),
            gradient: None,
            selective_color: BTreeMap::new(),
            sc_relative: true,
            cond_blend: None,
            mask: None,
            offset: (0, 0),
            precomp: None,
            image,
        }
    }

    /// Layer name (unique within a context).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the layer. Only the compositor should call this; contexts
    /// key layers by name.
    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// `true` if this layer has no source image of its own.
    pub fn is_adjustment_layer(&self) -> bool {
        self.image.is_none()
    }

    /// Source image, if this is an image layer.
    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    /// Replaces the source image without touching layer settings.
    pub fn set_image(&mut self, image: Image) {
        self.image = Some(image);
    }

    /// Width of the source image (0 for adjustment layers).
    pub fn width(&self) -> u32 {
        self.image.as_ref().map_or(0, Image::width)
    }

    /// Height of the source image (0 for adjustment layers).
    pub fn height(&self) -> u32 {
        self.image.as_ref().map_or(0, Image::height)
    }

    /// Layer opacity in `[0, 1]`.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Sets the opacity, clamped into `[0, 1]`.
    pub fn set_opacity(&mut self, val: f32) {
        self.opacity = val.clamp(0.0, 1.0);
    }

    /// Restores mode/opacity/visibility defaults and clears all
    /// adjustments.
    pub fn reset(&mut self) {
        self.mode = BlendMode::Normal;
        self.opacity = 1.0;
        self.visible = true;
        self.delete_all_adjustments();
    }

    // --- adjustment storage -------------------------------------------

    /// Sets one named adjustment parameter, creating the adjustment entry
    /// if needed. Existing values are overwritten.
    pub fn add_adjustment(&mut self, ty: AdjustmentType, param: impl Into<String>, val: f32) {
        self.adjustments.entry(ty).or_default().insert(param.into(), val);
    }

    /// Parameter map of one adjustment, if present.
    pub fn adjustment(&self, ty: AdjustmentType) -> Option<&ParamMap> {
        self.adjustments.get(&ty)
    }

    /// One parameter value, if present.
    pub fn adjustment_value(&self, ty: AdjustmentType, param: &str) -> Option<f32> {
        self.adjustments.get(&ty).and_then(|m| m.get(param)).copied()
    }

    /// Removes one adjustment (and its structural data).
    pub fn delete_adjustment(&mut self, ty: AdjustmentType) {
        self.adjustments.remove(&ty);
        match ty {
            AdjustmentType::Curves => self.curves.clear(),
            AdjustmentType::Gradient => self.gradient = None,
            AdjustmentType::SelectiveColor => self.selective_color.clear(),
            _ => {}
        }
    }

    /// Removes every adjustment.
    pub fn delete_all_adjustments(&mut self) {
        self.adjustments.clear();
        self.curves.clear();
        self.gradient = None;
        self.selective_color.clear();
    }

    /// `true` if any adjustment is stored.
    pub fn has_adjustments(&self) -> bool {
        !self.adjustments.is_empty()
    }

    /// Stored adjustment types in canonical (numeric) order.
    pub fn adjustment_types(&self) -> Vec<AdjustmentType> {
        self.adjustments.keys().copied().collect()
    }

    /// Stored adjustments in canonical order.
    pub fn adjustments(&self) -> impl Iterator<Item = (AdjustmentType, &ParamMap)> {
        self.adjustments.iter().map(|(t, m)| (*t, m))
    }

    // --- typed adders --------------------------------------------------

    /// Adds an HSL adjustment (all values stored in `[0, 1]`, 0.5
    /// neutral).
    pub fn add_hsl_adjustment(&mut self, hue: f32, sat: f32, light: f32) {
        self.add_adjustment(AdjustmentType::Hsl, "hue", hue);
        self.add_adjustment(AdjustmentType::Hsl, "sat", sat);
        self.add_adjustment(AdjustmentType::Hsl, "light", light);
    }

    /// Adds a levels adjustment. Inverted min/max pairs are auto-repaired
    /// by nudging the max to `min + 0.01` (clamped to 1).
    pub fn add_levels_adjustment(
        &mut self,
        in_min: f32,
        in_max: f32,
        gamma: f32,
        out_min: f32,
        out_max: f32,
    ) {
        let repair = |mn: f32, mx: f32| {
            if mx < mn {
                (mn, (mn + 0.01).min(1.0))
            } else {
                (mn, mx)
            }
        };
        let (in_min, in_max) = repair(in_min, in_max);
        let (out_min, out_max) = repair(out_min, out_max);

        self.add_adjustment(AdjustmentType::Levels, "inMin", in_min);
        self.add_adjustment(AdjustmentType::Levels, "inMax", in_max);
        self.add_adjustment(AdjustmentType::Levels, "gamma", gamma);
        self.add_adjustment(AdjustmentType::Levels, "outMin", out_min);
        self.add_adjustment(AdjustmentType::Levels, "outMax", out_max);
    }

    /// Sets the tone curve for a channel (`"r"`, `"g"`, `"b"`, or
    /// `"rgb"` for the combined master curve).
    pub fn add_curves_adjustment(&mut self, channel: impl Into<String>, curve: Arc<Curve>) {
        self.adjustments.entry(AdjustmentType::Curves).or_default();
        self.curves.insert(channel.into(), curve);
    }

    /// Curve stored for a channel.
    pub fn curve(&self, channel: &str) -> Option<&Arc<Curve>> {
        self.curves.get(channel)
    }

    /// Adds an exposure adjustment (stored `[0, 1]`; 0.5/0.5/0.1 is
    /// neutral).
    pub fn add_exposure_adjustment(&mut self, exposure: f32, offset: f32, gamma: f32) {
        self.add_adjustment(AdjustmentType::Exposure, "exposure", exposure);
        self.add_adjustment(AdjustmentType::Exposure, "offset", offset);
        self.add_adjustment(AdjustmentType::Exposure, "gamma", gamma);
    }

    /// Sets the gradient used by the gradient-map adjustment.
    pub fn add_gradient_adjustment(&mut self, gradient: Arc<Gradient>) {
        self.adjustments.entry(AdjustmentType::Gradient).or_default();
        self.gradient = Some(gradient);
    }

    /// Gradient of the gradient-map adjustment.
    pub fn gradient(&self) -> Option<&Arc<Gradient>> {
        self.gradient.as_ref()
    }

    /// Sets one selective-color grid entry (channel x CMYK color, stored
    /// `[0, 1]` with 0.5 neutral). Marks the adjustment active.
    pub fn set_selective_color_channel(
        &mut self,
        channel: impl Into<String>,
        color: impl Into<String>,
        value: f32,
    ) {
        self.adjustments
            .entry(AdjustmentType::SelectiveColor)
            .or_default();
        self.selective_color
            .entry(channel.into())
            .or_default()
            .insert(color.into(), value);
    }

    /// One selective-color grid value; unset entries read as 0.5 neutral.
    pub fn selective_color_channel(&self, channel: &str, color: &str) -> f32 {
        self.selective_color
            .get(channel)
            .and_then(|m| m.get(color))
            .copied()
            .unwrap_or(0.5)
    }

    /// Whether the selective-color adjustment applies relative (always
    /// true in the canonical pipeline; kept for the binding surface).
    pub fn selective_color_relative(&self) -> bool {
        self.sc_relative
    }

    /// Sets the selective-color relative flag.
    pub fn set_selective_color_relative(&mut self, relative: bool) {
        self.sc_relative = relative;
    }

    /// Adds a color balance adjustment; nine tone values stored `[0, 1]`
    /// (0.5 neutral) plus the luma-preservation flag.
    #[allow(clippy::too_many_arguments)]
    pub fn add_color_balance_adjustment(
        &mut self,
        shadow: [f32; 3],
        mid: [f32; 3],
        high: [f32; 3],
        preserve_luma: bool,
    ) {
        let t = AdjustmentType::ColorBalance;
        self.add_adjustment(t, "shadowR", shadow[0]);
        self.add_adjustment(t, "shadowG", shadow[1]);
        self.add_adjustment(t, "shadowB", shadow[2]);
        self.add_adjustment(t, "midR", mid[0]);
        self.add_adjustment(t, "midG", mid[1]);
        self.add_adjustment(t, "midB", mid[2]);
        self.add_adjustment(t, "highR", high[0]);
        self.add_adjustment(t, "highG", high[1]);
        self.add_adjustment(t, "highB", high[2]);
        self.add_adjustment(t, "preserveLuma", if preserve_luma { 1.0 } else { 0.0 });
    }

    /// Adds a photo filter adjustment.
    pub fn add_photo_filter_adjustment(
        &mut self,
        color: [f32; 3],
        density: f32,
        preserve_luma: bool,
    ) {
        let t = AdjustmentType::PhotoFilter;
        self.add_adjustment(t, "r", color[0]);
        self.add_adjustment(t, "g", color[1]);
        self.add_adjustment(t, "b", color[2]);
        self.add_adjustment(t, "density", density);
        self.add_adjustment(t, "preserveLuma", if preserve_luma { 1.0 } else { 0.0 });
    }

    /// Adds a colorize adjustment.
    pub fn add_colorize_adjustment(&mut self, color: [f32; 3], alpha: f32) {
        Self::add_color_alpha(self, AdjustmentType::Colorize, color, alpha);
    }

    /// Adds a lighter-colorize adjustment.
    pub fn add_lighter_colorize_adjustment(&mut self, color: [f32; 3], alpha: f32) {
        Self::add_color_alpha(self, AdjustmentType::LighterColorize, color, alpha);
    }

    /// Adds an overwrite-color adjustment.
    pub fn add_overwrite_color_adjustment(&mut self, color: [f32; 3], alpha: f32) {
        Self::add_color_alpha(self, AdjustmentType::OverwriteColor, color, alpha);
    }

    fn add_color_alpha(&mut self, ty: AdjustmentType, color: [f32; 3], alpha: f32) {
        self.add_adjustment(ty, "r", color[0]);
        self.add_adjustment(ty, "g", color[1]);
        self.add_adjustment(ty, "b", color[2]);
        self.add_adjustment(ty, "a", alpha);
    }

    /// Adds an invert adjustment.
    pub fn add_invert_adjustment(&mut self) {
        self.add_adjustment(AdjustmentType::Invert, "invert", 1.0);
    }

    /// Adds a brightness/contrast adjustment (stored `[0, 1]`, 0.5
    /// neutral).
    pub fn add_brightness_adjustment(&mut self, brightness: f32, contrast: f32) {
        self.add_adjustment(AdjustmentType::Brightness, "brightness", brightness);
        self.add_adjustment(AdjustmentType::Brightness, "contrast", contrast);
    }

    // --- masking, gating, placement ------------------------------------

    /// Optional layer mask; its Rec. 601 luma scaled by its alpha
    /// multiplies into the layer's source alpha.
    pub fn mask(&self) -> Option<&Image> {
        self.mask.as_ref()
    }

    /// Sets the layer mask.
    pub fn set_mask(&mut self, mask: Option<Image>) {
        self.mask = mask;
    }

    /// Conditional-blend ("blend if") configuration.
    pub fn conditional_blend(&self) -> Option<&ConditionalBlend> {
        self.cond_blend.as_ref()
    }

    /// Sets the conditional-blend configuration.
    pub fn set_conditional_blend(&mut self, cond: Option<ConditionalBlend>) {
        self.cond_blend = cond;
    }

    /// Pixel offset `(dx, dy)` applied when sampling the source image.
    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    /// Sets the pixel offset.
    pub fn set_offset(&mut self, dx: i32, dy: i32) {
        self.offset = (dx, dy);
    }

    /// Sub-layer names when this layer is a rendered precomposition.
    pub fn precomp_order(&self) -> Option<&[String]> {
        self.precomp.as_deref()
    }

    /// Marks this layer as a precomposition of the named sub-layers.
    pub fn set_precomp_order(&mut self, order: Option<Vec<String>>) {
        self.precomp = order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_layer(name: &str) -> Layer {
        Layer::new(name, Image::filled(2, 2, [255, 0, 0, 255]))
    }

    #[test]
    fn test_adjustment_layer_has_no_image() {
        let l = Layer::new_adjustment("adj");
        assert!(l.is_adjustment_layer());
        assert!(l.image().is_none());
        assert!(!image_layer("img").is_adjustment_layer());
    }

    #[test]
    fn test_opacity_clamped() {
        let mut l = image_layer("a");
        l.set_opacity(1.5);
        assert_eq!(l.opacity(), 1.0);
        l.set_opacity(-0.2);
        assert_eq!(l.opacity(), 0.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut l = image_layer("a");
        l.mode = BlendMode::Multiply;
        l.set_opacity(0.3);
        l.visible = false;
        l.add_hsl_adjustment(0.1, 0.2, 0.3);
        l.reset();
        assert_eq!(l.mode, BlendMode::Normal);
        assert_eq!(l.opacity(), 1.0);
        assert!(l.visible);
        assert!(l.adjustment_types().is_empty());
    }

    #[test]
    fn test_adjustments_iterate_in_type_order() {
        let mut l = image_layer("a");
        l.add_brightness_adjustment(0.5, 0.5);
        l.add_hsl_adjustment(0.5, 0.5, 0.5);
        l.add_levels_adjustment(0.0, 1.0, 0.1, 0.0, 1.0);
        let types = l.adjustment_types();
        assert_eq!(
            types,
            vec![
                AdjustmentType::Hsl,
                AdjustmentType::Levels,
                AdjustmentType::Brightness
            ]
        );
    }

    #[test]
    fn test_levels_auto_repair_inverted_range() {
        let mut l = image_layer("a");
        l.add_levels_adjustment(0.8, 0.2, 0.1, 0.0, 1.0);
        assert_eq!(l.adjustment_value(AdjustmentType::Levels, "inMin"), Some(0.8));
        let in_max = l.adjustment_value(AdjustmentType::Levels, "inMax").unwrap();
        assert!((in_max - 0.81).abs() < 1e-6);
    }

    #[test]
    fn test_levels_auto_repair_clamps_to_one() {
        let mut l = image_layer("a");
        l.add_levels_adjustment(0.995, 0.2, 0.1, 0.0, 1.0);
        assert_eq!(l.adjustment_value(AdjustmentType::Levels, "inMax"), Some(1.0));
    }

    #[test]
    fn test_selective_color_defaults_neutral() {
        let mut l = image_layer("a");
        l.set_selective_color_channel("reds", "cyan", 0.8);
        assert_eq!(l.selective_color_channel("reds", "cyan"), 0.8);
        assert_eq!(l.selective_color_channel("reds", "magenta"), 0.5);
        assert_eq!(l.selective_color_channel("blues", "black"), 0.5);
        assert!(l.adjustment(AdjustmentType::SelectiveColor).is_some());
    }

    #[test]
    fn test_delete_adjustment_clears_structural_data() {
        let mut l = image_layer("a");
        l.add_curves_adjustment(
            "r",
            Arc::new(
                Curve::new(vec![
                    retouch_color::Point::new(0.0, 0.0),
                    retouch_color::Point::new(1.0, 1.0),
                ])
                .unwrap(),
            ),
        );
        assert!(l.curve("r").is_some());
        l.delete_adjustment(AdjustmentType::Curves);
        assert!(l.curve("r").is_none());
        assert!(l.adjustment(AdjustmentType::Curves).is_none());
    }

    #[test]
    fn test_adjustment_type_values_round_trip() {
        for v in 0..=13 {
            let t = AdjustmentType::from_value(v).unwrap();
            assert_eq!(t.value(), v);
        }
        assert!(AdjustmentType::from_value(14).is_none());
    }

    #[test]
    fn test_adjustment_type_serializes_as_integer() {
        let json = serde_json::to_string(&AdjustmentType::SelectiveColor).unwrap();
        assert_eq!(json, "5");
        let back: AdjustmentType = serde_json::from_str("5").unwrap();
        assert_eq!(back, AdjustmentType::SelectiveColor);
    }

    #[test]
    fn test_layer_copy_shares_pixels() {
        let l = image_layer("a");
        let copy = l.clone();
        assert_eq!(copy.image().unwrap().pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(copy.name(), "a");
    }
}
