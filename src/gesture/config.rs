//! Gesture recognition settings.

use crate::capture::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the gesture detector and scanner loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Minimum visibility for nose and both wrists.
    pub min_visibility: f32,
    /// Nose must sit above this normalized y for the subject to count as framed.
    pub max_nose_y: f32,
    /// Consecutive qualifying samples before a gesture fires.
    pub required_streak: u32,
    /// Classify every Nth sampled frame.
    pub frame_skip: u32,
    /// Suppression window after a capture gesture, in seconds.
    pub cooldown_secs: u64,
    /// Exposure used for gesture-triggered captures, in seconds.
    pub capture_exposure_secs: u32,
    /// Classification input width.
    pub classify_width: u32,
    /// Classification input height.
    pub classify_height: u32,
    /// Delay between samples while scanning, in milliseconds.
    pub sample_interval_ms: u64,
    /// Delay between checks while scanning is disabled, in milliseconds.
    pub idle_poll_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_visibility: 0.3,
            max_nose_y: 0.85,
            required_streak: 3,
            frame_skip: 5,
            cooldown_secs: 6,
            capture_exposure_secs: 6,
            classify_width: 320,
            classify_height: 240,
            sample_interval_ms: 10,
            idle_poll_ms: 500,
        }
    }
}

impl GestureConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_visibility) {
            return Err(ConfigError::InvalidGesture(format!(
                "min_visibility {} outside 0-1",
                self.min_visibility
            )));
        }
        if !(0.0..=1.0).contains(&self.max_nose_y) {
            return Err(ConfigError::InvalidGesture(format!(
                "max_nose_y {} outside 0-1",
                self.max_nose_y
            )));
        }
        if self.required_streak == 0 {
            return Err(ConfigError::InvalidGesture("required_streak is 0".into()));
        }
        if self.frame_skip == 0 {
            return Err(ConfigError::InvalidGesture("frame_skip is 0".into()));
        }
        if self.capture_exposure_secs == 0 {
            return Err(ConfigError::InvalidGesture("capture_exposure_secs is 0".into()));
        }
        if self.classify_width == 0 || self.classify_height == 0 {
            return Err(ConfigError::InvalidGesture("classification size is 0".into()));
        }
        Ok(())
    }
}
