//! Prometheus metrics for the capture pipeline.
//!
//! Counters are kept by the components themselves as atomics; the
//! registry is refreshed from a [`MetricsSnapshot`] whenever it is
//! scraped.
//!
//! # Metrics Exposed
//!
//! ## Run State
//! - `lightpaint_capture_in_progress` - Whether a capture holds the busy slot
//! - `lightpaint_scanner_active` - Whether gesture scanning is enabled
//! - `lightpaint_capture_pending` - Whether a stacked image awaits keep/discard
//!
//! ## Capture Metrics
//! - `lightpaint_captures_completed_total` - Captures that produced an image
//! - `lightpaint_captures_failed_total` - Captures that failed after starting
//! - `lightpaint_captures_busy_total` - Captures rejected as busy
//! - `lightpaint_last_stack_frames` - Frames blended into the last capture
//!
//! ## Gesture Metrics
//! - `lightpaint_gesture_samples_total` - Frames pulled by the scanner
//! - `lightpaint_gesture_classified_total` - Frames run through the classifier
//! - `lightpaint_classifier_errors_total` - Classifier failures
//! - `lightpaint_gesture_captures_total` - Captures triggered by gesture
//! - `lightpaint_gesture_capture_failures_total` - Gesture captures that failed
//!
//! ## Gallery Metrics
//! - `lightpaint_gallery_items` - Photos currently kept
//!
//! # Example
//!
//! ```no_run
//! use lightpaint::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     scanner_active: true,
//!     captures_completed: 3,
//!     last_stack_frames: 58,
//!     gallery_items: 12,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
