//! Camera input and frame handling.
//!
//! This module provides abstractions for capturing frames from a camera,
//! sharing one camera between several consumers, and encoding frames
//! as JPEG.

mod camera;
mod config;
#[cfg(feature = "camera")]
mod device;
mod encode;
mod frame;

pub use camera::{Camera, CameraError, FrameSource, MockCamera, SharedCamera};
pub use config::{CaptureConfig, ConfigError, FileConfig, ServerConfig};
#[cfg(feature = "camera")]
pub use device::NokhwaCamera;
pub use encode::{encode_jpeg, write_jpeg, EncodeError};
pub use frame::{Frame, CHANNELS};
