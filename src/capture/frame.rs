//! Frame type representing a captured RGB image with metadata.

use image::{imageops, imageops::FilterType, RgbImage};
use std::time::Instant;

/// Number of interleaved channels per pixel (R, G, B).
pub const CHANNELS: usize = 3;

/// A single captured frame from the camera.
///
/// Pixels are stored as tightly packed 8-bit RGB, row-major. The channel
/// order is RGB throughout the pipeline: stacking, encoding and pose
/// classification all consume it as-is.
#[derive(Clone)]
pub struct Frame {
    /// Interleaved RGB pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Creates a frame where every pixel has the same color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        let mut pixels = Vec::with_capacity(pixel_count * CHANNELS);
        for _ in 0..pixel_count {
            pixels.extend_from_slice(&rgb);
        }
        Self::new(pixels, width, height, sequence)
    }

    /// Builds a frame from an `image` RGB buffer.
    pub fn from_rgb_image(image: RgbImage, sequence: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, sequence)
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * CHANNELS
    }

    /// Returns true if both frames have identical dimensions.
    pub fn same_shape(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Copies the pixels into an `image` buffer.
    ///
    /// Returns `None` if the buffer does not match the dimensions.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Moves the pixels into an `image` buffer without copying.
    pub fn into_rgb_image(self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.pixels)
    }

    /// Resamples the frame to the target resolution.
    ///
    /// Used to shrink frames before pose classification. Returns a clone
    /// when the frame already has the requested size.
    pub fn downscale(&self, width: u32, height: u32) -> Option<Frame> {
        if self.width == width && self.height == height {
            return Some(self.clone());
        }
        let image = self.to_rgb_image()?;
        let resized = imageops::resize(&image, width, height, FilterType::Triangle);
        Some(Frame::from_rgb_image(resized, self.sequence))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
