//! Camera devices and the shared frame source.
//!
//! Hardware and synthetic cameras implement [`Camera`]. A single camera
//! is shared between the preview stream, the capture orchestrator and the
//! gesture scanner through [`SharedCamera`].

use super::{CaptureConfig, Frame, CHANNELS};
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("no frame available yet")]
    NoFrame,
    #[error("camera not initialized")]
    NotInitialized,
}

/// Trait for camera implementations.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait Camera {
    /// Opens and initializes the camera with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures a single frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

/// Non-blocking pull access to the most recent camera frame.
///
/// Implementations must be safe to call from several threads at once.
/// Consumers may not assume ordering or exclusivity: two callers can
/// observe the same frame, and frames can be missed between pulls.
pub trait FrameSource: Send + Sync {
    /// Returns the most recent frame, or `None` if none is available.
    fn latest_frame(&self) -> Option<Frame>;
}

/// Mock camera for testing that generates synthetic frames.
///
/// Each frame is a dark background with a bright spot that moves
/// horizontally, so stacking a burst produces a visible light trail.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!("MockCamera opened with config: {:?}", config);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;

        let width = config.width as usize;
        let height = config.height as usize;
        let radius = (height / 16).max(1);
        let spot_x = (self.sequence as usize * 7) % width;
        let spot_y = height / 2;

        let mut pixels = vec![16u8; width * height * CHANNELS];
        for y in spot_y.saturating_sub(radius)..(spot_y + radius).min(height) {
            for x in spot_x.saturating_sub(radius)..(spot_x + radius).min(width) {
                let offset = (y * width + x) * CHANNELS;
                pixels[offset..offset + CHANNELS].copy_from_slice(&[255, 220, 120]);
            }
        }

        self.sequence += 1;
        Ok(Frame::new(pixels, config.width, config.height, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        self.config = None;
        tracing::info!("MockCamera closed");
    }
}

/// Thread-safe singleton handle around one opened camera.
///
/// Frame pulls are serialized through a mutex; a failed pull is logged
/// and reported as "no frame" so callers can skip it and retry.
pub struct SharedCamera {
    inner: Mutex<Box<dyn Camera + Send>>,
}

impl SharedCamera {
    /// Wraps an already opened camera.
    pub fn new(camera: Box<dyn Camera + Send>) -> Self {
        Self {
            inner: Mutex::new(camera),
        }
    }

    /// Opens the camera with `config` and wraps it.
    pub fn open(
        mut camera: Box<dyn Camera + Send>,
        config: &CaptureConfig,
    ) -> Result<Self, CameraError> {
        camera.open(config)?;
        Ok(Self::new(camera))
    }

    /// Returns true while the wrapped camera is open.
    pub fn is_open(&self) -> bool {
        self.inner
            .lock()
            .map(|camera| camera.is_open())
            .unwrap_or(false)
    }

    /// Closes the wrapped camera. Safe to call more than once.
    pub fn release(&self) {
        let mut camera = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if camera.is_open() {
            camera.close();
        }
    }
}

impl FrameSource for SharedCamera {
    fn latest_frame(&self) -> Option<Frame> {
        let mut camera = self.inner.lock().ok()?;
        match camera.capture() {
            Ok(frame) => Some(frame),
            Err(CameraError::NoFrame) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Frame pull failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for SharedCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCamera")
            .field("open", &self.is_open())
            .finish()
    }
}
