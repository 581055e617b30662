//! Lightpaint
//!
//! A light-painting camera appliance. A long exposure is simulated by
//! sampling the live camera for a few seconds and blending the frames
//! with a "lighten" stack, so moving light sources leave trails. Captures
//! are started over HTTP or by raising one arm in front of the camera;
//! raising both arms shuts the appliance down.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────── gesture scanner ◄──┐
//!                  ▼                                │
//! HTTP ──► exposure orchestrator ──► stacking ──► temp.jpg ──► gallery
//!                  ▲                                           (keep/discard)
//!                  └──────────────── camera ───────────────────► MJPEG preview
//! ```
//!
//! All components share one [`RunState`]: the single-capture busy slot,
//! the pending-capture flag, the scanner toggle and the quit signal.
//!
//! # Example
//!
//! ```no_run
//! use lightpaint::{
//!     capture::{CaptureConfig, FrameSource, MockCamera, SharedCamera},
//!     exposure::{CaptureOrchestrator, ExposureConfig},
//!     gallery::{GalleryConfig, GalleryStore},
//!     RunState,
//! };
//! use std::sync::Arc;
//!
//! let state = Arc::new(RunState::new());
//! let camera: Arc<dyn FrameSource> = Arc::new(
//!     SharedCamera::open(Box::new(MockCamera::new()), &CaptureConfig::default()).unwrap(),
//! );
//!
//! let gallery = GalleryStore::open(GalleryConfig::default(), Arc::clone(&state)).unwrap();
//! let orchestrator = CaptureOrchestrator::new(
//!     camera,
//!     Arc::clone(&state),
//!     gallery.temp_path().to_path_buf(),
//!     ExposureConfig::default(),
//! );
//!
//! let outcome = orchestrator.capture(3).unwrap();
//! println!("stacked {} frames", outcome.frames);
//!
//! let item = gallery.promote().unwrap();
//! println!("kept as {}", item.id);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod exposure;
pub mod gallery;
pub mod gesture;
pub mod metrics;
#[cfg(feature = "server")]
pub mod server;
pub mod stacking;
pub mod state;

// Re-export commonly used types at crate root
pub use capture::{Camera, CaptureConfig, FileConfig, Frame, FrameSource, MockCamera};
pub use exposure::{CaptureError, CaptureOrchestrator, CaptureOutcome, ExposureConfig};
pub use gallery::{GalleryConfig, GalleryStore};
pub use gesture::{GestureConfig, GestureDetector, GestureEvent, GestureScanner};
pub use stacking::stack;
pub use state::RunState;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
