//! JPEG encoding of frames for the preview stream and stacked results.

use super::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while encoding or writing an image.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame buffer does not match {width}x{height} RGB")]
    InvalidFrame { width: u32, height: u32 },
    #[error("jpeg encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Encodes an RGB frame as JPEG with the given quality (1-100).
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, EncodeError> {
    if !frame.is_valid() {
        return Err(EncodeError::InvalidFrame {
            width: frame.width(),
            height: frame.height(),
        });
    }

    let mut buffer = Vec::with_capacity(frame.pixels().len() / 8);
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode(
        frame.pixels(),
        frame.width(),
        frame.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}

/// Encodes a frame and writes it to `path`, replacing any existing file.
///
/// The bytes are written to a sibling file first and renamed into place so
/// readers never observe a half-written image.
pub fn write_jpeg(frame: &Frame, path: &Path, quality: u8) -> Result<(), EncodeError> {
    let bytes = encode_jpeg(frame, quality)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let staging = path.with_extension("jpg.part");
    std::fs::write(&staging, &bytes)?;
    std::fs::rename(&staging, path)?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote JPEG");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_jpeg_markers() {
        let frame = Frame::filled(16, 16, [200, 100, 50], 1);
        let bytes = encode_jpeg(&frame, 85).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_rejects_invalid_frame() {
        let frame = Frame::new(vec![0u8; 10], 16, 16, 1);
        assert!(matches!(
            encode_jpeg(&frame, 85),
            Err(EncodeError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_write_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static").join("temp.jpg");

        write_jpeg(&Frame::filled(8, 8, [0, 0, 0], 1), &path, 90).unwrap();
        let first = std::fs::read(&path).unwrap();

        write_jpeg(&Frame::filled(8, 8, [255, 255, 255], 2), &path, 90).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_ne!(first, second);
        assert!(!path.with_extension("jpg.part").exists());
    }
}
