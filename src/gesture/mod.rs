//! Hands-free gesture control.
//!
//! A background scanner samples the camera, asks a pose classifier for
//! body keypoints and runs a small state machine over the nose and wrist
//! positions:
//!
//! ```text
//!             scanner_active = false
//!   ┌──────┐ ◀──────────────────────── ┌──────────┐
//!   │ Idle │                           │ Sampling │ ── 3× one arm up ──▶ capture ─┐
//!   └──────┘ ────────────────────────▶ └──────────┘                              │
//!             scanner_active = true       ▲     │                                │
//!                                         │     └── 3× both arms up ──▶ quit     │
//!                                         │                                      ▼
//!                                         └──────── cooldown elapsed ──── ┌──────────┐
//!                                                                         │ Cooldown │
//!                                                                         └──────────┘
//! ```

mod classifier;
mod config;
mod detector;
mod landmarks;
mod scanner;
mod trigger;

pub use classifier::{ClassifierError, MockClassifier, PoseClassifier};
pub use config::GestureConfig;
pub use detector::{GestureDetector, GestureEvent, Pose};
pub use landmarks::{Landmark, LandmarkSet, PoseLandmark, POSE_LANDMARK_COUNT};
pub use scanner::{GestureScanner, ScannerHandle, ScannerStats, ScannerStatsSnapshot, Step};
pub use trigger::{CaptureTrigger, TriggerError};
