//! Exposure-windowed capture with a process-wide busy guard.

use super::session::CaptureSession;
use crate::capture::{write_jpeg, FrameSource};
use crate::stacking;
use crate::state::RunState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`CaptureOrchestrator::capture`].
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("another capture is already in progress")]
    Busy,
    #[error("invalid exposure of {0}s (must be 1-{1}s)")]
    InvalidExposure(u32, u32),
    #[error("no frames captured during a {0}s exposure")]
    NoFramesCaptured(u32),
    #[error("capture failed: {0}")]
    Failed(String),
}

impl CaptureError {
    /// HTTP-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CaptureError::Busy => 429,
            CaptureError::InvalidExposure(..) => 400,
            CaptureError::NoFramesCaptured(_) | CaptureError::Failed(_) => 500,
        }
    }
}

/// Exposure settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureConfig {
    /// Exposure used when a request does not name one, in seconds.
    pub default_exposure_secs: u32,
    /// Longest accepted exposure, in seconds.
    pub max_exposure_secs: u32,
    /// Interval between frame samples, in milliseconds.
    pub sample_interval_ms: u64,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            default_exposure_secs: 3,
            max_exposure_secs: 60,
            sample_interval_ms: 50, // ~20 samples per second
        }
    }
}

impl ExposureConfig {
    /// Returns the sampling interval.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), crate::capture::ConfigError> {
        use crate::capture::ConfigError;

        if self.max_exposure_secs == 0 {
            return Err(ConfigError::InvalidExposure("max_exposure_secs is 0".into()));
        }
        if self.default_exposure_secs == 0 || self.default_exposure_secs > self.max_exposure_secs {
            return Err(ConfigError::InvalidExposure(format!(
                "default_exposure_secs {} outside 1-{}",
                self.default_exposure_secs, self.max_exposure_secs
            )));
        }
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::InvalidExposure("sample_interval_ms is 0".into()));
        }
        Ok(())
    }
}

/// Result of a successful capture.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureOutcome {
    /// Where the stacked image was written.
    pub path: PathBuf,
    /// Frames that went into the stack.
    pub frames: usize,
    /// Sampling ticks that produced no frame.
    pub skipped: u32,
    /// Stacked image width.
    pub width: u32,
    /// Stacked image height.
    pub height: u32,
    /// Requested exposure in seconds.
    pub exposure_secs: u32,
}

/// Running counters exported as metrics.
#[derive(Debug, Default)]
pub struct CaptureStats {
    completed: AtomicU64,
    failed: AtomicU64,
    busy_rejected: AtomicU64,
    last_frame_count: AtomicU64,
}

/// Point-in-time copy of [`CaptureStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStatsSnapshot {
    pub completed: u64,
    pub failed: u64,
    pub busy_rejected: u64,
    pub last_frame_count: u64,
}

impl CaptureStats {
    /// Returns the current counter values.
    pub fn snapshot(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            busy_rejected: self.busy_rejected.load(Ordering::Relaxed),
            last_frame_count: self.last_frame_count.load(Ordering::Relaxed),
        }
    }
}

/// Runs exposure-windowed captures against a shared frame source.
///
/// Safe to call from any thread. At most one capture runs at a time;
/// concurrent callers are rejected with [`CaptureError::Busy`] rather
/// than queued.
pub struct CaptureOrchestrator {
    source: Arc<dyn FrameSource>,
    state: Arc<RunState>,
    temp_path: PathBuf,
    config: ExposureConfig,
    jpeg_quality: u8,
    stats: CaptureStats,
}

impl CaptureOrchestrator {
    /// Creates an orchestrator writing results to `temp_path`.
    pub fn new(
        source: Arc<dyn FrameSource>,
        state: Arc<RunState>,
        temp_path: impl Into<PathBuf>,
        config: ExposureConfig,
    ) -> Self {
        Self {
            source,
            state,
            temp_path: temp_path.into(),
            config,
            jpeg_quality: 90,
            stats: CaptureStats::default(),
        }
    }

    /// Sets the JPEG quality of the stacked output.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Returns the temporary result path.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Returns the exposure configuration.
    pub fn config(&self) -> &ExposureConfig {
        &self.config
    }

    /// Returns the running counters.
    pub fn stats(&self) -> CaptureStatsSnapshot {
        self.stats.snapshot()
    }

    /// Captures with the configured default exposure.
    pub fn capture_default(&self) -> Result<CaptureOutcome, CaptureError> {
        self.capture(self.config.default_exposure_secs)
    }

    /// Samples frames for `exposure_secs`, stacks them and writes the
    /// result to the temporary slot.
    ///
    /// Blocks the calling thread for the full exposure.
    pub fn capture(&self, exposure_secs: u32) -> Result<CaptureOutcome, CaptureError> {
        if exposure_secs == 0 || exposure_secs > self.config.max_exposure_secs {
            return Err(CaptureError::InvalidExposure(
                exposure_secs,
                self.config.max_exposure_secs,
            ));
        }

        let Some(_guard) = self.state.try_begin_capture() else {
            self.stats.busy_rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(exposure_secs, "Capture rejected: already in progress");
            return Err(CaptureError::Busy);
        };

        let result = self.run_capture(exposure_secs);
        match &result {
            Ok(outcome) => {
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
                self.stats
                    .last_frame_count
                    .store(outcome.frames as u64, Ordering::Relaxed);
                tracing::info!(
                    frames = outcome.frames,
                    skipped = outcome.skipped,
                    path = %outcome.path.display(),
                    "Capture complete"
                );
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Capture failed");
            }
        }
        result
    }

    fn run_capture(&self, exposure_secs: u32) -> Result<CaptureOutcome, CaptureError> {
        tracing::info!(exposure_secs, "Starting capture");

        let interval = self.config.sample_interval();
        let mut session = CaptureSession::start(Duration::from_secs(exposure_secs as u64));
        while session.is_open() {
            match self.source.latest_frame() {
                Some(frame) => {
                    tracing::trace!(sequence = frame.sequence(), "Sampled frame");
                    session.push(frame);
                }
                None => {
                    tracing::debug!("No frame available, skipping sample");
                    session.skip();
                }
            }
            std::thread::sleep(interval);
        }

        if session.frame_count() == 0 {
            return Err(CaptureError::NoFramesCaptured(exposure_secs));
        }

        let skipped = session.skipped();
        let frames = session.into_frames();
        let frame_count = frames.len();

        let stacked =
            stacking::stack(&frames).map_err(|e| CaptureError::Failed(e.to_string()))?;
        drop(frames);

        write_jpeg(&stacked, &self.temp_path, self.jpeg_quality)
            .map_err(|e| CaptureError::Failed(e.to_string()))?;
        self.state.set_capture_done(true);

        Ok(CaptureOutcome {
            path: self.temp_path.clone(),
            frames: frame_count,
            skipped,
            width: stacked.width(),
            height: stacked.height(),
            exposure_secs,
        })
    }
}

impl std::fmt::Debug for CaptureOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureOrchestrator")
            .field("temp_path", &self.temp_path)
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
