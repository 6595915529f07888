//! End-to-end pipeline scenarios exercising render, adjustments, and the
//! parameter vector contract together.

use retouch_core::Image;
use retouch_engine::{
    context_to_vector, vector_to_context, AdjustmentType, BlendMode, Compositor, FULL_SIZE,
};

fn solid(r: u8, g: u8, b: u8, a: u8) -> Image {
    Image::filled(2, 2, [r, g, b, a])
}

#[test]
fn opaque_red_layer_renders_as_itself() {
    let mut comp = Compositor::new();
    comp.add_layer("red", solid(255, 0, 0, 255));
    let out = comp.render_primary(FULL_SIZE);
    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(out.pixel(x, y), [255, 0, 0, 255]);
        }
    }
}

#[test]
fn half_opacity_red_keeps_straight_color() {
    let mut comp = Compositor::new();
    comp.add_layer("red", solid(255, 0, 0, 255));
    comp.layer_mut("red").unwrap().set_opacity(0.5);
    let out = comp.render_primary(FULL_SIZE);
    let px = out.pixel(0, 0);
    assert!((px[3] as i32 - 128).abs() <= 1);
    // un-premultiplied color survives the premultiply/divide round trip
    assert_eq!(&px[..3], &[255, 0, 0]);
}

#[test]
fn multiply_green_over_blue_is_black() {
    let mut comp = Compositor::new();
    comp.add_layer("blue", solid(0, 0, 255, 255));
    comp.add_layer("green", solid(0, 255, 0, 255));
    comp.layer_mut("green").unwrap().mode = BlendMode::Multiply;
    let out = comp.render_primary(FULL_SIZE);
    assert_eq!(out.pixel(1, 1), [0, 0, 0, 255]);
}

#[test]
fn full_range_unit_gamma_levels_is_identity() {
    let mut comp = Compositor::new();
    comp.add_layer("gray", solid(128, 128, 128, 255));
    // stored gamma 0.1 scales to 1.0
    comp.layer_mut("gray")
        .unwrap()
        .add_levels_adjustment(0.0, 1.0, 0.1, 0.0, 1.0);
    let out = comp.render_primary(FULL_SIZE);
    let px = out.pixel(0, 0);
    for c in 0..3 {
        assert!((px[c] as i32 - 128).abs() <= 1, "channel {c} was {}", px[c]);
    }
}

#[test]
fn invert_twice_restores_composite() {
    let mut comp = Compositor::new();
    comp.add_layer("img", solid(37, 119, 201, 255));
    let before = comp.render_primary(FULL_SIZE);

    let layer = comp.layer_mut("img").unwrap();
    layer.add_invert_adjustment();
    let inverted = comp.render_primary(FULL_SIZE);
    assert_ne!(before.pixel(0, 0), inverted.pixel(0, 0));

    // stacking a second inversion via an adjustment layer undoes the first
    comp.add_adjustment_layer("undo");
    comp.layer_mut("undo").unwrap().add_invert_adjustment();
    let restored = comp.render_primary(FULL_SIZE);
    let a = before.pixel(0, 0);
    let b = restored.pixel(0, 0);
    for c in 0..3 {
        assert!((a[c] as i32 - b[c] as i32).abs() <= 1, "channel {c}");
    }
}

#[test]
fn vector_schema_for_three_adjusted_layers() {
    let mut comp = Compositor::new();
    comp.add_layer("l1", solid(10, 20, 30, 255));
    comp.add_layer("l2", solid(40, 50, 60, 255));
    comp.add_layer("l3", solid(70, 80, 90, 255));
    comp.layer_mut("l1").unwrap().add_hsl_adjustment(0.4, 0.55, 0.5);
    comp.layer_mut("l2")
        .unwrap()
        .add_levels_adjustment(0.05, 0.95, 0.12, 0.0, 1.0);
    comp.layer_mut("l3")
        .unwrap()
        .set_selective_color_channel("yellows", "magenta", 0.61);

    let (vector, key) = context_to_vector(comp.primary_context());
    assert_eq!(vector.len(), 3 + 3 + 5 + 36);

    let sc = key
        .iter()
        .filter(|e| e.adjustment_type == AdjustmentType::SelectiveColor)
        .count();
    assert_eq!(sc, 36);
}

#[test]
fn round_trip_renders_identically() {
    let mut comp = Compositor::new();
    comp.add_layer("base", solid(200, 180, 160, 255));
    comp.add_layer("grade", solid(90, 110, 130, 220));
    {
        let g = comp.layer_mut("grade").unwrap();
        g.mode = BlendMode::Overlay;
        g.set_opacity(0.65);
        g.add_hsl_adjustment(0.52, 0.47, 0.51);
        g.add_brightness_adjustment(0.55, 0.48);
        g.set_selective_color_channel("reds", "yellow", 0.58);
    }

    let c = comp.new_context();
    let (vector, key) = context_to_vector(&c);
    let rebuilt = vector_to_context(&vector, &key, &c).unwrap();

    let a = comp.render(&c, FULL_SIZE);
    let b = comp.render(&rebuilt, FULL_SIZE);
    assert_eq!(a.data(), b.data());
}

#[test]
fn transparent_layers_never_corrupt_the_composite() {
    for mode in [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::LinearDodge,
        BlendMode::ColorDodge,
        BlendMode::LinearBurn,
        BlendMode::LinearLight,
        BlendMode::Color,
        BlendMode::Lighten,
        BlendMode::Darken,
        BlendMode::PinLight,
    ] {
        let mut comp = Compositor::new();
        comp.add_layer("bg", solid(120, 140, 160, 255));
        comp.add_layer("ghost", solid(255, 255, 255, 0));
        comp.layer_mut("ghost").unwrap().mode = mode;
        let out = comp.render_primary(FULL_SIZE);
        // a zero-alpha source leaves the composite untouched in every mode
        assert_eq!(out.pixel(0, 0), [120, 140, 160, 255], "{mode:?}");
    }
}

#[test]
fn render_pixel_agrees_with_full_render_across_modes() {
    let mut comp = Compositor::new();
    comp.add_layer("bg", solid(25, 75, 125, 255));
    comp.add_layer("fg", solid(230, 180, 130, 190));
    {
        let fg = comp.layer_mut("fg").unwrap();
        fg.mode = BlendMode::LinearLight;
        fg.set_opacity(0.85);
        fg.add_exposure_adjustment(0.55, 0.5, 0.1);
    }
    let c = comp.new_context();
    let full = comp.render(&c, FULL_SIZE);
    for y in 0..2 {
        for x in 0..2 {
            let px = comp.render_pixel(&c, x, y);
            let expected = full.pixel(x, y);
            for ch in 0..4 {
                assert_eq!((px[ch] * 255.0).round() as u8, expected[ch]);
            }
        }
    }
}
