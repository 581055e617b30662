//! Delivery of gesture-initiated captures to the orchestrator.

use crate::exposure::{CaptureError, CaptureOrchestrator, CaptureOutcome};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Errors from a gesture-initiated capture.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("capture rejected: {0}")]
    Rejected(#[from] CaptureError),
    #[error("capture trigger not delivered: {0}")]
    Delivery(String),
}

/// Something that can start a capture on behalf of the gesture scanner.
///
/// Gesture captures go through exactly the same entry point as HTTP
/// requests, so they are subject to the same busy guard.
pub trait CaptureTrigger: Send + Sync {
    /// Starts a capture and blocks until it completes.
    fn trigger(&self, exposure_secs: u32) -> Result<CaptureOutcome, TriggerError>;
}

impl CaptureTrigger for CaptureOrchestrator {
    fn trigger(&self, exposure_secs: u32) -> Result<CaptureOutcome, TriggerError> {
        // A panicking capture must not take the gesture thread down with it.
        match panic::catch_unwind(AssertUnwindSafe(|| self.capture(exposure_secs))) {
            Ok(result) => result.map_err(TriggerError::from),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "capture panicked".to_string());
                Err(TriggerError::Delivery(reason))
            }
        }
    }
}
