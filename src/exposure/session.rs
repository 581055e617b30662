//! Transient state for one capture operation.

use crate::capture::Frame;
use std::time::{Duration, Instant};

/// Frames accumulated over one exposure window.
///
/// Created when a capture request is accepted and consumed by
/// [`into_frames`](CaptureSession::into_frames) once the window closes.
#[derive(Debug)]
pub struct CaptureSession {
    started: Instant,
    exposure: Duration,
    frames: Vec<Frame>,
    skipped: u32,
}

impl CaptureSession {
    /// Starts a session that accepts frames for `exposure`.
    pub fn start(exposure: Duration) -> Self {
        Self {
            started: Instant::now(),
            exposure,
            frames: Vec::new(),
            skipped: 0,
        }
    }

    /// Returns the requested exposure duration.
    pub fn exposure(&self) -> Duration {
        self.exposure
    }

    /// Returns the time since the session started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns true while the exposure window is still open.
    pub fn is_open(&self) -> bool {
        self.elapsed() < self.exposure
    }

    /// Appends a sampled frame.
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Records a sampling tick that produced no frame.
    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    /// Returns the number of frames accumulated so far.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of ticks that produced no frame.
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    /// Consumes the session, yielding its frames in capture order.
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}
