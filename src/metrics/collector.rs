//! Metrics collection and registry.

use crate::exposure::CaptureStatsSnapshot;
use crate::gesture::ScannerStatsSnapshot;
use crate::state::RunSnapshot;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of system state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether a capture currently holds the busy slot.
    pub capture_in_progress: bool,
    /// Whether gesture scanning is enabled.
    pub scanner_active: bool,
    /// Whether a stacked image awaits keep/discard.
    pub capture_pending: bool,
    /// Captures that produced an image.
    pub captures_completed: u64,
    /// Captures that failed after acquiring the slot.
    pub captures_failed: u64,
    /// Captures rejected because another was running.
    pub captures_busy: u64,
    /// Frames that went into the most recent stack.
    pub last_stack_frames: u64,
    /// Frames pulled by the gesture scanner.
    pub gesture_samples: u64,
    /// Frames the pose classifier processed.
    pub gesture_classified: u64,
    /// Pose classifier failures.
    pub classifier_errors: u64,
    /// Captures started by gesture.
    pub gesture_captures: u64,
    /// Gesture captures that returned an error.
    pub gesture_capture_failures: u64,
    /// Photos currently kept in the gallery.
    pub gallery_items: usize,
}

/// Prometheus metrics registry for the capture pipeline.
pub struct MetricsRegistry {
    registry: Registry,

    // Run state
    capture_in_progress: IntGauge,
    scanner_active: IntGauge,
    capture_pending: IntGauge,

    // Capture metrics
    captures_completed: IntCounter,
    captures_failed: IntCounter,
    captures_busy: IntCounter,
    last_stack_frames: IntGauge,

    // Gesture metrics
    gesture_samples: IntCounter,
    gesture_classified: IntCounter,
    classifier_errors: IntCounter,
    gesture_captures: IntCounter,
    gesture_capture_failures: IntCounter,

    // Gallery metrics
    gallery_items: IntGauge,
}

/// Advances a counter to a monotonically increasing total.
fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all pipeline metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let capture_in_progress = IntGauge::new(
            "lightpaint_capture_in_progress",
            "Whether a capture is running (1=yes, 0=no)",
        )?;
        let scanner_active = IntGauge::new(
            "lightpaint_scanner_active",
            "Whether gesture scanning is enabled (1=yes, 0=no)",
        )?;
        let capture_pending = IntGauge::new(
            "lightpaint_capture_pending",
            "Whether a stacked image awaits keep or discard",
        )?;

        let captures_completed = IntCounter::new(
            "lightpaint_captures_completed_total",
            "Captures that produced a stacked image",
        )?;
        let captures_failed = IntCounter::new(
            "lightpaint_captures_failed_total",
            "Captures that failed after starting",
        )?;
        let captures_busy = IntCounter::new(
            "lightpaint_captures_busy_total",
            "Captures rejected because another was in progress",
        )?;
        let last_stack_frames = IntGauge::new(
            "lightpaint_last_stack_frames",
            "Frames blended into the most recent capture",
        )?;

        let gesture_samples = IntCounter::new(
            "lightpaint_gesture_samples_total",
            "Frames pulled by the gesture scanner",
        )?;
        let gesture_classified = IntCounter::new(
            "lightpaint_gesture_classified_total",
            "Frames processed by the pose classifier",
        )?;
        let classifier_errors = IntCounter::new(
            "lightpaint_classifier_errors_total",
            "Pose classification failures",
        )?;
        let gesture_captures = IntCounter::new(
            "lightpaint_gesture_captures_total",
            "Captures triggered by gesture",
        )?;
        let gesture_capture_failures = IntCounter::new(
            "lightpaint_gesture_capture_failures_total",
            "Gesture-triggered captures that failed",
        )?;

        let gallery_items = IntGauge::new(
            "lightpaint_gallery_items",
            "Photos currently kept in the gallery",
        )?;

        registry.register(Box::new(capture_in_progress.clone()))?;
        registry.register(Box::new(scanner_active.clone()))?;
        registry.register(Box::new(capture_pending.clone()))?;
        registry.register(Box::new(captures_completed.clone()))?;
        registry.register(Box::new(captures_failed.clone()))?;
        registry.register(Box::new(captures_busy.clone()))?;
        registry.register(Box::new(last_stack_frames.clone()))?;
        registry.register(Box::new(gesture_samples.clone()))?;
        registry.register(Box::new(gesture_classified.clone()))?;
        registry.register(Box::new(classifier_errors.clone()))?;
        registry.register(Box::new(gesture_captures.clone()))?;
        registry.register(Box::new(gesture_capture_failures.clone()))?;
        registry.register(Box::new(gallery_items.clone()))?;

        Ok(Self {
            registry,
            capture_in_progress,
            scanner_active,
            capture_pending,
            captures_completed,
            captures_failed,
            captures_busy,
            last_stack_frames,
            gesture_samples,
            gesture_classified,
            classifier_errors,
            gesture_captures,
            gesture_capture_failures,
            gallery_items,
        })
    }

    /// Updates all metrics from a snapshot of system state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.capture_in_progress
            .set(snapshot.capture_in_progress as i64);
        self.scanner_active.set(snapshot.scanner_active as i64);
        self.capture_pending.set(snapshot.capture_pending as i64);

        advance(&self.captures_completed, snapshot.captures_completed);
        advance(&self.captures_failed, snapshot.captures_failed);
        advance(&self.captures_busy, snapshot.captures_busy);
        self.last_stack_frames.set(snapshot.last_stack_frames as i64);

        advance(&self.gesture_samples, snapshot.gesture_samples);
        advance(&self.gesture_classified, snapshot.gesture_classified);
        advance(&self.classifier_errors, snapshot.classifier_errors);
        advance(&self.gesture_captures, snapshot.gesture_captures);
        advance(
            &self.gesture_capture_failures,
            snapshot.gesture_capture_failures,
        );

        self.gallery_items.set(snapshot.gallery_items as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of pipeline components.
    pub fn from_components(
        run: &RunSnapshot,
        capture: &CaptureStatsSnapshot,
        scanner: Option<&ScannerStatsSnapshot>,
        gallery_items: usize,
    ) -> Self {
        let scanner = scanner.copied().unwrap_or_default();
        Self {
            capture_in_progress: run.capture_in_progress,
            scanner_active: run.scanner_active,
            capture_pending: run.capture_done,
            captures_completed: capture.completed,
            captures_failed: capture.failed,
            captures_busy: capture.busy_rejected,
            last_stack_frames: capture.last_frame_count,
            gesture_samples: scanner.samples,
            gesture_classified: scanner.classified,
            classifier_errors: scanner.classifier_errors,
            gesture_captures: scanner.captures_triggered,
            gesture_capture_failures: scanner.trigger_failures,
            gallery_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let run = RunSnapshot {
            scanner_active: true,
            capture_in_progress: false,
            capture_done: true,
            quit_requested: false,
        };
        let capture = CaptureStatsSnapshot {
            completed: 4,
            failed: 1,
            busy_rejected: 2,
            last_frame_count: 60,
        };
        let scanner = ScannerStatsSnapshot {
            samples: 500,
            classified: 100,
            classifier_errors: 0,
            captures_triggered: 3,
            trigger_failures: 1,
        };

        registry.update(&MetricsSnapshot::from_components(&run, &capture, Some(&scanner), 7));

        let output = registry.encode().unwrap();
        assert!(output.contains("lightpaint_scanner_active 1"));
        assert!(output.contains("lightpaint_capture_pending 1"));
        assert!(output.contains("lightpaint_captures_completed_total 4"));
        assert!(output.contains("lightpaint_captures_busy_total 2"));
        assert!(output.contains("lightpaint_last_stack_frames 60"));
        assert!(output.contains("lightpaint_gesture_captures_total 3"));
        assert!(output.contains("lightpaint_gallery_items 7"));
    }

    #[test]
    fn test_counters_never_decrease() {
        let registry = MetricsRegistry::new().unwrap();

        let mut snapshot = MetricsSnapshot {
            captures_completed: 5,
            ..Default::default()
        };
        registry.update(&snapshot);
        snapshot.captures_completed = 3;
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("lightpaint_captures_completed_total 5"));
    }
}
