//! Lighten-blend stacking.
//!
//! Simulates a long exposure from a short burst: every output channel is
//! the brightest value any frame recorded at that position, which keeps
//! moving light sources as continuous trails over a static scene.

use crate::capture::Frame;
use thiserror::Error;

/// Brightness scale applied after blending to keep highlights off the clip point.
pub const ATTENUATION: f32 = 0.9;

/// Errors that can occur during stacking.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackError {
    #[error("cannot stack an empty frame sequence")]
    EmptyInput,
    #[error("frame {index} is {got_width}x{got_height}, expected {width}x{height}")]
    ShapeMismatch {
        index: usize,
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
    #[error("frame {index} pixel buffer does not match its dimensions")]
    InvalidFrame { index: usize },
}

/// Combines a burst of frames into one brightened composite.
///
/// Channel values are normalized to `[0, 1]` as `f32`, reduced with a
/// per-channel maximum, scaled by [`ATTENUATION`], clamped and rounded
/// back to 8 bits. The output has the shape of the inputs and carries the
/// sequence number of the last frame.
pub fn stack(frames: &[Frame]) -> Result<Frame, StackError> {
    let first = frames.first().ok_or(StackError::EmptyInput)?;

    for (index, frame) in frames.iter().enumerate() {
        if !frame.is_valid() {
            return Err(StackError::InvalidFrame { index });
        }
        if !frame.same_shape(first) {
            return Err(StackError::ShapeMismatch {
                index,
                width: first.width(),
                height: first.height(),
                got_width: frame.width(),
                got_height: frame.height(),
            });
        }
    }

    let mut stacked: Vec<f32> = first.pixels().iter().map(|&v| v as f32 / 255.0).collect();

    for (index, frame) in frames.iter().enumerate().skip(1) {
        for (acc, &value) in stacked.iter_mut().zip(frame.pixels()) {
            *acc = acc.max(value as f32 / 255.0);
        }
        tracing::trace!(stacked = index + 1, "Blended frame");
    }

    let pixels: Vec<u8> = stacked
        .into_iter()
        .map(|v| ((v * ATTENUATION).clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();

    let last = &frames[frames.len() - 1];
    tracing::debug!(
        frames = frames.len(),
        width = first.width(),
        height = first.height(),
        "Stacking complete"
    );

    Ok(Frame::new(pixels, first.width(), first.height(), last.sequence()))
}
