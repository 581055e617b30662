//! Capture orchestration.
//!
//! Accumulates frames from the shared camera over an exposure window,
//! stacks them into one image and writes it to the single temporary slot.
//! A test-and-set on the run state guarantees that only one capture is
//! ever accumulating frames, whether it was started from HTTP or by a
//! gesture.

mod orchestrator;
mod session;

pub use orchestrator::{
    CaptureError, CaptureOrchestrator, CaptureOutcome, CaptureStats, CaptureStatsSnapshot,
    ExposureConfig,
};
pub use session::CaptureSession;
