//! # retouch-io
//!
//! PNG load/save of the engine's boundary pixel layout: flat row-major
//! RGBA8, four bytes per pixel, no padding, top-left origin. Non-RGBA
//! PNGs (grayscale, RGB, palette) are expanded to that layout on load.

#![warn(missing_docs)]

use retouch_core::Image;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

/// Result type alias using [`IoError`] as the error type.
pub type Result<T> = std::result::Result<T, IoError>;

/// Errors raised while decoding or encoding PNG files.
#[derive(Debug, Error)]
pub enum IoError {
    /// Underlying file I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG decode failure.
    #[error("png decode error: {0}")]
    Decode(#[from] png::DecodingError),

    /// PNG encode failure.
    #[error("png encode error: {0}")]
    Encode(#[from] png::EncodingError),

    /// Decoded buffer did not match the engine's expectations.
    #[error("unsupported png layout: {0}")]
    Unsupported(String),

    /// Image construction failure (dimension mismatch).
    #[error(transparent)]
    Core(#[from] retouch_core::CoreError),
}

/// Loads a PNG file into an RGBA8 [`Image`].
pub fn load_png(path: impl AsRef<Path>) -> Result<Image> {
    let path = path.as_ref();
    let mut decoder = png::Decoder::new(File::open(path)?);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder.read_info()?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    let (w, h) = (info.width, info.height);
    let rgba = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        png::ColorType::Grayscale => buf
            .iter()
            .flat_map(|&v| [v, v, v, 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|px| [px[0], px[0], px[0], px[1]])
            .collect(),
        other => {
            return Err(IoError::Unsupported(format!(
                "color type {other:?} after expansion"
            )))
        }
    };

    tracing::debug!(path = %path.display(), w, h, "loaded png");
    Ok(Image::from_data(w, h, rgba)?)
}

/// Saves an RGBA8 [`Image`] as a PNG file.
pub fn save_png(path: impl AsRef<Path>, image: &Image) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let w = BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.data())?;

    tracing::debug!(path = %path.display(), "saved png");
    Ok(())
}

/// Encodes an image to in-memory PNG bytes (the binding-layer exchange
/// form).
pub fn encode_png(image: &Image) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(image.data())?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rt.png");

        let mut img = Image::new(3, 2);
        for (i, px) in [
            [255u8, 0, 0, 255],
            [0, 255, 0, 128],
            [0, 0, 255, 0],
            [10, 20, 30, 40],
            [200, 100, 50, 255],
            [1, 2, 3, 4],
        ]
        .iter()
        .enumerate()
        {
            img.set_pixel((i % 3) as u32, (i / 3) as u32, *px);
        }

        save_png(&path, &img).unwrap();
        let back = load_png(&path).unwrap();
        assert_eq!(back.width(), 3);
        assert_eq!(back.height(), 2);
        assert_eq!(back.data(), img.data());
    }

    #[test]
    fn test_encode_in_memory_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.png");
        let img = Image::filled(4, 4, [9, 8, 7, 255]);
        save_png(&path, &img).unwrap();
        let bytes = encode_png(&img).unwrap();
        let from_file = std::fs::read(&path).unwrap();
        assert_eq!(bytes, from_file);
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(load_png("/definitely/not/here.png").is_err());
    }
}
