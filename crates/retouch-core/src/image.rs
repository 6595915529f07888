//! RGBA8 image buffer used throughout the compositing pipeline.
//!
//! All pixel storage is flat row-major RGBA, 4 bytes per pixel, no padding,
//! top-left origin. Blend and adjustment math happens in normalized `f32`
//! space; conversion to and from bytes occurs only at pipeline boundaries,
//! which is why [`Image`] exposes both byte ([`Image::pixel`]) and
//! normalized ([`Image::pixel_f32`]) accessors.
//!
//! # Memory management
//!
//! The pixel buffer is stored in an [`Arc<Vec<u8>>`]:
//! - cloning an `Image` is cheap and shares the buffer,
//! - mutation goes through [`Arc::make_mut`] (copy-on-write), so a clone
//!   held by another layer or thread is never disturbed.
//!
//! This is what makes the compositor's "duplicate before mutate" rule safe
//! by construction: an adjustment pass always works on its own copy.

use crate::{CoreError, Result};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Rec. 601 luma weight for the red channel.
pub const LUMA_R: f32 = 0.299;
/// Rec. 601 luma weight for the green channel.
pub const LUMA_G: f32 = 0.587;
/// Rec. 601 luma weight for the blue channel.
pub const LUMA_B: f32 = 0.114;

/// Rec. 601 luma of a normalized RGB triple.
#[inline]
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
    LUMA_R * r + LUMA_G * g + LUMA_B * b
}

/// Derived statistics computed by [`Image::analyze`].
///
/// Stats are cached on the image and cleared by any mutation, so repeated
/// `analyze` calls on an unchanged image are free after the first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    /// Sum of normalized alpha over all pixels.
    pub total_alpha: f64,
    /// Mean normalized alpha.
    pub avg_alpha: f64,
    /// Sum of normalized Rec. 601 luma over all pixels.
    pub total_luma: f64,
    /// Mean normalized Rec. 601 luma.
    pub avg_luma: f64,
}

/// Owned RGBA8 image buffer.
///
/// # Example
///
/// ```rust
/// use retouch_core::Image;
///
/// let mut img = Image::new(16, 16);
/// img.set_pixel(3, 4, [255, 0, 0, 255]);
/// assert_eq!(img.pixel(3, 4), [255, 0, 0, 255]);
/// ```
#[derive(Clone)]
pub struct Image {
    data: Arc<Vec<u8>>,
    width: u32,
    height: u32,
    stats: Option<ImageStats>,
}

impl Image {
    /// Creates a fully transparent black image.
    pub fn new(width: u32, height: u32) -> Self {
        let data = vec![0u8; width as usize * height as usize * 4];
        Self {
            data: Arc::new(data),
            width,
            height,
            stats: None,
        }
    }

    /// Creates an image from an existing RGBA byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDimensions`] if `data.len()` is not
    /// exactly `width * height * 4`.
    pub fn from_data(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(CoreError::InvalidDimensions {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data: Arc::new(data),
            width,
            height,
            stats: None,
        })
    }

    /// Creates an image filled with a constant RGBA pixel.
    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 4);
        for _ in 0..count {
            data.extend_from_slice(&pixel);
        }
        Self {
            data: Arc::new(data),
            width,
            height,
            stats: None,
        }
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (`width * height`).
    #[inline]
    pub fn num_px(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// `true` if the image has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw RGBA byte data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the RGBA byte data.
    ///
    /// Triggers copy-on-write if the buffer is shared and invalidates any
    /// cached statistics.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.stats = None;
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Returns the RGBA bytes at `(x, y)`.
    ///
    /// Out-of-bounds access recovers by returning transparent black and
    /// logging a warning; it never panics. Callers on hot paths should stay
    /// in bounds and use [`Image::data`] directly.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            tracing::warn!(x, y, width = self.width, height = self.height, "pixel out of bounds");
            return [0, 0, 0, 0];
        }
        let o = self.offset(x, y);
        [self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]]
    }

    /// Returns the pixel at `(x, y)` normalized to `[0, 1]` floats.
    #[inline]
    pub fn pixel_f32(&self, x: u32, y: u32) -> [f32; 4] {
        let p = self.pixel(x, y);
        [
            p[0] as f32 / 255.0,
            p[1] as f32 / 255.0,
            p[2] as f32 / 255.0,
            p[3] as f32 / 255.0,
        ]
    }

    /// Sets the RGBA bytes at `(x, y)`. Out-of-bounds writes are dropped
    /// with a warning.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        if x >= self.width || y >= self.height {
            tracing::warn!(x, y, width = self.width, height = self.height, "pixel write out of bounds");
            return;
        }
        let o = self.offset(x, y);
        let data = self.data_mut();
        data[o..o + 4].copy_from_slice(&pixel);
    }

    /// Fills the entire image with a constant pixel value.
    pub fn fill(&mut self, pixel: [u8; 4]) {
        for chunk in self.data_mut().chunks_exact_mut(4) {
            chunk.copy_from_slice(&pixel);
        }
    }

    /// Computes (and caches) aggregate alpha and luma statistics.
    pub fn analyze(&mut self) -> ImageStats {
        if let Some(stats) = self.stats {
            return stats;
        }

        let mut total_alpha = 0.0f64;
        let mut total_luma = 0.0f64;
        for px in self.data.chunks_exact(4) {
            let r = px[0] as f32 / 255.0;
            let g = px[1] as f32 / 255.0;
            let b = px[2] as f32 / 255.0;
            total_alpha += (px[3] as f32 / 255.0) as f64;
            total_luma += luma(r, g, b) as f64;
        }

        let n = self.num_px().max(1) as f64;
        let stats = ImageStats {
            total_alpha,
            avg_alpha: total_alpha / n,
            total_luma,
            avg_luma: total_luma / n,
        };
        self.stats = stats.into();
        stats
    }

    /// Returns a bilinearly resampled copy at `scale` times the current
    /// size. The original image is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidScale`] for non-positive or non-finite
    /// scale factors.
    pub fn resize(&self, scale: f32) -> Result<Image> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CoreError::InvalidScale(scale));
        }

        let nw = ((self.width as f32 * scale).round() as u32).max(1);
        let nh = ((self.height as f32 * scale).round() as u32).max(1);
        self.resize_to(nw, nh)
    }

    /// Returns a bilinearly resampled copy at exactly `nw x nh`.
    pub fn resize_to(&self, nw: u32, nh: u32) -> Result<Image> {
        if nw == 0 || nh == 0 {
            return Err(CoreError::InvalidDimensions {
                width: nw,
                height: nh,
                expected: 0,
                actual: 0,
            });
        }
        if self.is_empty() {
            return Ok(Image::new(nw, nh));
        }

        let sx = self.width as f32 / nw as f32;
        let sy = self.height as f32 / nh as f32;

        let mut out = vec![0u8; nw as usize * nh as usize * 4];

        let sample_row = |y: usize, row: &mut [u8]| {
            let fy = ((y as f32 + 0.5) * sy - 0.5).max(0.0);
            let y0 = (fy as u32).min(self.height - 1);
            let y1 = (y0 + 1).min(self.height - 1);
            let ty = fy - y0 as f32;

            for x in 0..nw as usize {
                let fx = ((x as f32 + 0.5) * sx - 0.5).max(0.0);
                let x0 = (fx as u32).min(self.width - 1);
                let x1 = (x0 + 1).min(self.width - 1);
                let tx = fx - x0 as f32;

                let p00 = self.pixel(x0, y0);
                let p10 = self.pixel(x1, y0);
                let p01 = self.pixel(x0, y1);
                let p11 = self.pixel(x1, y1);

                for c in 0..4 {
                    let top = p00[c] as f32 * (1.0 - tx) + p10[c] as f32 * tx;
                    let bot = p01[c] as f32 * (1.0 - tx) + p11[c] as f32 * tx;
                    let v = top * (1.0 - ty) + bot * ty;
                    row[x * 4 + c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        };

        #[cfg(feature = "parallel")]
        out.par_chunks_exact_mut(nw as usize * 4)
            .enumerate()
            .for_each(|(y, row)| sample_row(y, row));

        #[cfg(not(feature = "parallel"))]
        for (y, row) in out.chunks_exact_mut(nw as usize * 4).enumerate() {
            sample_row(y, row);
        }

        Image::from_data(nw, nh, out)
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("analyzed", &self.stats.is_some())
            .finish()
    }
}
