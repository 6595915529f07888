//! Color records and conversions, generic over the concrete float width.
//!
//! All conversions operate on normalized `[0, 1]` channel values. Hue is
//! expressed in degrees `[0, 360)`. The degenerate achromatic case
//! (`max == min`) yields hue 0 and saturation 0 in both HSL and HSY.
//!
//! HSY deliberately differs from HSL: saturation is the raw chroma
//! (`max - min`) and "Y" is the weighted luma `0.30 R + 0.59 G + 0.11 B`,
//! not HSL's lightness. The COLOR blend mode and the colorize adjustments
//! depend on exactly this definition.
//!
//! Lab goes through linear sRGB (inverse companding) to a D50-adapted XYZ
//! and uses the standard CIE piecewise cube-root with
//! `epsilon = 216/24389`, `kappa = 24389/27`.

use retouch_expr::{primitive_fn, Real};

/// RGB triple, channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb<T> {
    /// Red.
    pub r: T,
    /// Green.
    pub g: T,
    /// Blue.
    pub b: T,
}

/// Hue/saturation/lightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl<T> {
    /// Hue in degrees `[0, 360)`.
    pub h: T,
    /// Saturation in `[0, 1]`.
    pub s: T,
    /// Lightness in `[0, 1]`.
    pub l: T,
}

/// Hue/chroma/luma. See the module docs for how this differs from HSL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsy<T> {
    /// Hue in degrees `[0, 360)`.
    pub h: T,
    /// Chroma (`max - min`).
    pub s: T,
    /// Weighted luma `0.30 R + 0.59 G + 0.11 B`.
    pub y: T,
}

/// Cyan/magenta/yellow/black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cmyk<T> {
    /// Cyan.
    pub c: T,
    /// Magenta.
    pub m: T,
    /// Yellow.
    pub y: T,
    /// Black.
    pub k: T,
}

/// CIE L*a*b* (D50).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lab<T> {
    /// Lightness, `[0, 100]`.
    pub l: T,
    /// Green-red axis.
    pub a: T,
    /// Blue-yellow axis.
    pub b: T,
}

impl<T> Rgb<T> {
    /// Constructs an RGB triple.
    pub fn new(r: T, g: T, b: T) -> Self {
        Self { r, g, b }
    }
}

#[inline]
fn max3<T: Real>(a: T, b: T, c: T) -> T {
    a.max(b).max(c)
}

#[inline]
fn min3<T: Real>(a: T, b: T, c: T) -> T {
    a.min(b).min(c)
}

fn hue_of<T: Real>(r: T, g: T, b: T, mx: T, d: T) -> T {
    let six = T::from_f32(6.0);
    let h = if mx == r {
        let base = (g - b) / d;
        if g < b { base + six } else { base }
    } else if mx == g {
        (b - r) / d + T::from_f32(2.0)
    } else {
        (r - g) / d + T::from_f32(4.0)
    };
    h * T::from_f32(60.0)
}

/// RGB to HSL.
pub fn rgb_to_hsl<T: Real>(r: T, g: T, b: T) -> Hsl<T> {
    let mx = max3(r, g, b);
    let mn = min3(r, g, b);
    let half = T::from_f32(0.5);
    let l = (mx + mn) * half;

    if mx == mn {
        return Hsl {
            h: T::from_f32(0.0),
            s: T::from_f32(0.0),
            l,
        };
    }

    let d = mx - mn;
    let s = if l > half {
        d / (T::from_f32(2.0) - mx - mn)
    } else {
        d / (mx + mn)
    };

    Hsl {
        h: hue_of(r, g, b, mx, d),
        s,
        l,
    }
}

fn hue_to_channel<T: Real>(p: T, q: T, t: T) -> T {
    let one = T::from_f32(1.0);
    let t = t.wrap(one);
    if t < T::from_f32(1.0 / 6.0) {
        p + (q - p) * T::from_f32(6.0) * t
    } else if t < T::from_f32(0.5) {
        q
    } else if t < T::from_f32(2.0 / 3.0) {
        p + (q - p) * (T::from_f32(2.0 / 3.0) - t) * T::from_f32(6.0)
    } else {
        p
    }
}

/// HSL to RGB.
pub fn hsl_to_rgb<T: Real>(h: T, s: T, l: T) -> Rgb<T> {
    if s == T::from_f32(0.0) {
        return Rgb::new(l, l, l);
    }

    let q = if l < T::from_f32(0.5) {
        l * (T::from_f32(1.0) + s)
    } else {
        l + s - l * s
    };
    let p = T::from_f32(2.0) * l - q;
    let hn = h.wrap(T::from_f32(360.0)) / T::from_f32(360.0);

    Rgb::new(
        hue_to_channel(p, q, hn + T::from_f32(1.0 / 3.0)),
        hue_to_channel(p, q, hn),
        hue_to_channel(p, q, hn - T::from_f32(1.0 / 3.0)),
    )
}

/// RGB to HSY.
pub fn rgb_to_hsy<T: Real>(r: T, g: T, b: T) -> Hsy<T> {
    let mx = max3(r, g, b);
    let mn = min3(r, g, b);
    let y = T::from_f32(0.30) * r + T::from_f32(0.59) * g + T::from_f32(0.11) * b;

    if mx == mn {
        return Hsy {
            h: T::from_f32(0.0),
            s: T::from_f32(0.0),
            y,
        };
    }

    let d = mx - mn;
    Hsy {
        h: hue_of(r, g, b, mx, d),
        s: d,
        y,
    }
}

/// HSY to RGB.
pub fn hsy_to_rgb<T: Real>(h: T, s: T, y: T) -> Rgb<T> {
    let h = h.wrap(T::from_f32(360.0));
    let hp = h / T::from_f32(60.0);
    let c = s;
    let one = T::from_f32(1.0);
    let x = c * (one - (hp.wrap(T::from_f32(2.0)) - one).abs());
    let zero = T::from_f32(0.0);

    let (r1, g1, b1) = if hp < T::from_f32(1.0) {
        (c, x, zero)
    } else if hp < T::from_f32(2.0) {
        (x, c, zero)
    } else if hp < T::from_f32(3.0) {
        (zero, c, x)
    } else if hp < T::from_f32(4.0) {
        (zero, x, c)
    } else if hp < T::from_f32(5.0) {
        (x, zero, c)
    } else {
        (c, zero, x)
    };

    let m = y - (T::from_f32(0.30) * r1 + T::from_f32(0.59) * g1 + T::from_f32(0.11) * b1);
    Rgb::new(r1 + m, g1 + m, b1 + m)
}

/// RGB to CMYK. The degenerate black (`K == 1`) maps to `C = M = Y = 0`.
pub fn rgb_to_cmyk<T: Real>(r: T, g: T, b: T) -> Cmyk<T> {
    let one = T::from_f32(1.0);
    let k = one - max3(r, g, b);

    if k == one {
        return Cmyk {
            c: T::from_f32(0.0),
            m: T::from_f32(0.0),
            y: T::from_f32(0.0),
            k,
        };
    }

    let d = one - k;
    Cmyk {
        c: (one - r - k) / d,
        m: (one - g - k) / d,
        y: (one - b - k) / d,
        k,
    }
}

/// CMYK to RGB.
pub fn cmyk_to_rgb<T: Real>(c: T, m: T, y: T, k: T) -> Rgb<T> {
    let one = T::from_f32(1.0);
    Rgb::new(
        (one - c) * (one - k),
        (one - m) * (one - k),
        (one - y) * (one - k),
    )
}

// CIE constants, exact rational forms.
const LAB_EPSILON: f32 = 216.0 / 24389.0;
const LAB_KAPPA: f32 = 24389.0 / 27.0;

// D50 reference white.
const D50_XN: f32 = 0.96422;
const D50_YN: f32 = 1.0;
const D50_ZN: f32 = 0.82521;

fn srgb_decompand<T: Real>(v: T) -> T {
    if v > T::from_f32(0.04045) {
        ((v + T::from_f32(0.055)) / T::from_f32(1.055)).powf(T::from_f32(2.4))
    } else {
        v / T::from_f32(12.92)
    }
}

fn srgb_compand<T: Real>(v: T) -> T {
    if v > T::from_f32(0.003_130_8) {
        T::from_f32(1.055) * v.powf(T::from_f32(1.0 / 2.4)) - T::from_f32(0.055)
    } else {
        v * T::from_f32(12.92)
    }
}

fn lab_f<T: Real>(t: T) -> T {
    if t > T::from_f32(LAB_EPSILON) {
        t.powf(T::from_f32(1.0 / 3.0))
    } else {
        (T::from_f32(LAB_KAPPA) * t + T::from_f32(16.0)) / T::from_f32(116.0)
    }
}

/// RGB (sRGB-encoded) to CIE Lab, via D50-adapted XYZ.
pub fn rgb_to_lab<T: Real>(r: T, g: T, b: T) -> Lab<T> {
    let r = srgb_decompand(r);
    let g = srgb_decompand(g);
    let b = srgb_decompand(b);

    // sRGB -> XYZ, Bradford-adapted to D50.
    let x = T::from_f32(0.436_074_7) * r + T::from_f32(0.385_064_9) * g + T::from_f32(0.143_080_4) * b;
    let y = T::from_f32(0.222_504_5) * r + T::from_f32(0.716_878_6) * g + T::from_f32(0.060_616_9) * b;
    let z = T::from_f32(0.013_932_2) * r + T::from_f32(0.097_104_5) * g + T::from_f32(0.714_173_3) * b;

    let fx = lab_f(x / T::from_f32(D50_XN));
    let fy = lab_f(y / T::from_f32(D50_YN));
    let fz = lab_f(z / T::from_f32(D50_ZN));

    Lab {
        l: T::from_f32(116.0) * fy - T::from_f32(16.0),
        a: T::from_f32(500.0) * (fx - fy),
        b: T::from_f32(200.0) * (fy - fz),
    }
}

/// CIE Lab (D50) back to sRGB-encoded RGB. Out-of-gamut values are not
/// clamped; callers clamp at the pipeline boundary.
pub fn lab_to_rgb<T: Real>(l: T, a: T, b: T) -> Rgb<T> {
    let fy = (l + T::from_f32(16.0)) / T::from_f32(116.0);
    let fx = fy + a / T::from_f32(500.0);
    let fz = fy - b / T::from_f32(200.0);

    let eps = T::from_f32(LAB_EPSILON);
    let kappa = T::from_f32(LAB_KAPPA);

    let fx3 = fx * fx * fx;
    let xr = if fx3 > eps {
        fx3
    } else {
        (T::from_f32(116.0) * fx - T::from_f32(16.0)) / kappa
    };
    let yr = if l > kappa * eps {
        fy * fy * fy
    } else {
        l / kappa
    };
    let fz3 = fz * fz * fz;
    let zr = if fz3 > eps {
        fz3
    } else {
        (T::from_f32(116.0) * fz - T::from_f32(16.0)) / kappa
    };

    let x = xr * T::from_f32(D50_XN);
    let y = yr * T::from_f32(D50_YN);
    let z = zr * T::from_f32(D50_ZN);

    // XYZ (D50) -> linear sRGB.
    let r = T::from_f32(3.133_856_1) * x - T::from_f32(1.616_866_7) * y - T::from_f32(0.490_614_6) * z;
    let g = T::from_f32(-0.978_768_4) * x + T::from_f32(1.916_141_5) * y + T::from_f32(0.033_454) * z;
    let b = T::from_f32(0.071_945_3) * x - T::from_f32(0.228_991_4) * y + T::from_f32(1.405_242_7) * z;

    Rgb::new(srgb_compand(r), srgb_compand(g), srgb_compand(b))
}

// Slice-shaped bodies for the primitive catalog. Symbolic traces call the
// conversions by these names instead of inlining the branches.

fn rgb_to_hsl_slice<T: Real>(args: &[T]) -> Vec<T> {
    let c = rgb_to_hsl(args[0], args[1], args[2]);
    vec![c.h, c.s, c.l]
}

fn hsl_to_rgb_slice<T: Real>(args: &[T]) -> Vec<T> {
    let c = hsl_to_rgb(args[0], args[1], args[2]);
    vec![c.r, c.g, c.b]
}

fn rgb_to_hsy_slice<T: Real>(args: &[T]) -> Vec<T> {
    let c = rgb_to_hsy(args[0], args[1], args[2]);
    vec![c.h, c.s, c.y]
}

fn hsy_to_rgb_slice<T: Real>(args: &[T]) -> Vec<T> {
    let c = hsy_to_rgb(args[0], args[1], args[2]);
    vec![c.r, c.g, c.b]
}

fn rgb_to_cmyk_slice<T: Real>(args: &[T]) -> Vec<T> {
    let c = rgb_to_cmyk(args[0], args[1], args[2]);
    vec![c.c, c.m, c.y, c.k]
}

fn cmyk_to_rgb_slice<T: Real>(args: &[T]) -> Vec<T> {
    let c = cmyk_to_rgb(args[0], args[1], args[2], args[3]);
    vec![c.r, c.g, c.b]
}

fn rgb_to_lab_slice<T: Real>(args: &[T]) -> Vec<T> {
    let c = rgb_to_lab(args[0], args[1], args[2]);
    vec![c.l, c.a, c.b]
}

fn lab_to_rgb_slice<T: Real>(args: &[T]) -> Vec<T> {
    let c = lab_to_rgb(args[0], args[1], args[2]);
    vec![c.r, c.g, c.b]
}

primitive_fn!(pub RgbToHslFn, "RGBToHSL", 3, 3, rgb_to_hsl_slice);
primitive_fn!(pub HslToRgbFn, "HSLToRGB", 3, 3, hsl_to_rgb_slice);
primitive_fn!(pub RgbToHsyFn, "RGBToHSY", 3, 3, rgb_to_hsy_slice);
primitive_fn!(pub HsyToRgbFn, "HSYToRGB", 3, 3, hsy_to_rgb_slice);
primitive_fn!(pub RgbToCmykFn, "RGBToCMYK", 3, 4, rgb_to_cmyk_slice);
primitive_fn!(pub CmykToRgbFn, "CMYKToRGB", 4, 3, cmyk_to_rgb_slice);
primitive_fn!(pub RgbToLabFn, "RGBToLab", 3, 3, rgb_to_lab_slice);
primitive_fn!(pub LabToRgbFn, "LabToRGB", 3, 3, lab_to_rgb_slice);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hsl_primaries() {
        let red = rgb_to_hsl(1.0f32, 0.0, 0.0);
        assert_relative_eq!(red.h, 0.0);
        assert_relative_eq!(red.s, 1.0);
        assert_relative_eq!(red.l, 0.5);

        let green = rgb_to_hsl(0.0f32, 1.0, 0.0);
        assert_relative_eq!(green.h, 120.0);

        let blue = rgb_to_hsl(0.0f32, 0.0, 1.0);
        assert_relative_eq!(blue.h, 240.0);
    }

    #[test]
    fn test_hsl_achromatic_degenerate() {
        let gray = rgb_to_hsl(0.5f32, 0.5, 0.5);
        assert_eq!(gray.h, 0.0);
        assert_eq!(gray.s, 0.0);
        assert_relative_eq!(gray.l, 0.5);
    }

    #[test]
    fn test_hsl_round_trip() {
        for &(r, g, b) in &[(0.2f32, 0.4, 0.8), (0.9, 0.1, 0.3), (0.6, 0.6, 0.1)] {
            let h = rgb_to_hsl(r, g, b);
            let back = hsl_to_rgb(h.h, h.s, h.l);
            assert_relative_eq!(back.r, r, epsilon = 1e-5);
            assert_relative_eq!(back.g, g, epsilon = 1e-5);
            assert_relative_eq!(back.b, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_hsy_luma_is_not_lightness() {
        let c = rgb_to_hsy(0.0f32, 1.0, 0.0);
        assert_relative_eq!(c.y, 0.59);
        assert_relative_eq!(c.s, 1.0);
        assert_relative_eq!(c.h, 120.0);
        // HSL lightness of pure green would be 0.5
        assert_relative_eq!(rgb_to_hsl(0.0f32, 1.0, 0.0).l, 0.5);
    }

    #[test]
    fn test_hsy_round_trip() {
        for &(r, g, b) in &[(0.2f32, 0.4, 0.8), (0.7, 0.3, 0.1)] {
            let c = rgb_to_hsy(r, g, b);
            let back = hsy_to_rgb(c.h, c.s, c.y);
            assert_relative_eq!(back.r, r, epsilon = 1e-5);
            assert_relative_eq!(back.g, g, epsilon = 1e-5);
            assert_relative_eq!(back.b, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_cmyk_black_degenerate() {
        let c = rgb_to_cmyk(0.0f32, 0.0, 0.0);
        assert_eq!(c.k, 1.0);
        assert_eq!(c.c, 0.0);
        assert_eq!(c.m, 0.0);
        assert_eq!(c.y, 0.0);
    }

    #[test]
    fn test_cmyk_round_trip() {
        for &(r, g, b) in &[(0.25f32, 0.5, 0.75), (1.0, 0.2, 0.0)] {
            let c = rgb_to_cmyk(r, g, b);
            let back = cmyk_to_rgb(c.c, c.m, c.y, c.k);
            assert_relative_eq!(back.r, r, epsilon = 1e-5);
            assert_relative_eq!(back.g, g, epsilon = 1e-5);
            assert_relative_eq!(back.b, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_lab_white_point() {
        let white = rgb_to_lab(1.0f32, 1.0, 1.0);
        assert_relative_eq!(white.l, 100.0, epsilon = 0.05);
        assert_relative_eq!(white.a, 0.0, epsilon = 0.05);
        assert_relative_eq!(white.b, 0.0, epsilon = 0.05);

        let black = rgb_to_lab(0.0f32, 0.0, 0.0);
        assert_relative_eq!(black.l, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_lab_round_trip() {
        for &(r, g, b) in &[(0.2f32, 0.4, 0.8), (0.9, 0.5, 0.1)] {
            let c = rgb_to_lab(r, g, b);
            let back = lab_to_rgb(c.l, c.a, c.b);
            assert_relative_eq!(back.r, r, epsilon = 1e-3);
            assert_relative_eq!(back.g, g, epsilon = 1e-3);
            assert_relative_eq!(back.b, b, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_primitive_wrappers_match_direct() {
        use retouch_expr::PrimitiveFn;
        let direct = rgb_to_hsl(0.3f32, 0.6, 0.9);
        let via = RgbToHslFn.eval32(&[0.3, 0.6, 0.9]);
        assert_relative_eq!(via[0], direct.h);
        assert_relative_eq!(via[1], direct.s);
        assert_relative_eq!(via[2], direct.l);
    }

    #[test]
    fn test_f32_f64_agree() {
        let a = rgb_to_hsl(0.31f32, 0.62, 0.93);
        let b = rgb_to_hsl(0.31f64, 0.62, 0.93);
        assert_relative_eq!(a.h as f64, b.h, epsilon = 1e-3);
        assert_relative_eq!(a.s as f64, b.s, epsilon = 1e-5);
        assert_relative_eq!(a.l as f64, b.l, epsilon = 1e-5);
    }
}
