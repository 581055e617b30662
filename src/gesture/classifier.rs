//! Pose classifier seam.
//!
//! The landmark detector itself is an external model; the scanner only
//! needs something that turns a small RGB image into landmark sets.

use super::LandmarkSet;
use image::RgbImage;
use std::collections::VecDeque;
use thiserror::Error;

/// Errors reported by a pose classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("pose model not loaded: {0}")]
    NotLoaded(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unsupported input {width}x{height}")]
    UnsupportedInput { width: u32, height: u32 },
}

/// Trait for pose landmark detectors.
///
/// Inputs are RGB images already downscaled by the scanner. An empty
/// result means nobody was detected.
pub trait PoseClassifier: Send {
    /// Detects people in `image` and returns one landmark set per person.
    fn classify(&mut self, image: &RgbImage) -> Result<Vec<LandmarkSet>, ClassifierError>;

    /// Releases model resources. Called once when the scanner stops.
    fn release(&mut self) {}
}

/// Scripted classifier for tests and demos.
///
/// Replays queued results in order; once the script runs out it keeps
/// returning the fallback (no detections by default).
#[derive(Debug, Default)]
pub struct MockClassifier {
    script: VecDeque<Result<Vec<LandmarkSet>, ClassifierError>>,
    fallback: Vec<LandmarkSet>,
    calls: usize,
    released: bool,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a single-person detection.
    pub fn push_pose(&mut self, pose: LandmarkSet) -> &mut Self {
        self.script.push_back(Ok(vec![pose]));
        self
    }

    /// Queues a frame with nobody detected.
    pub fn push_empty(&mut self) -> &mut Self {
        self.script.push_back(Ok(Vec::new()));
        self
    }

    /// Queues a classification failure.
    pub fn push_error(&mut self, error: ClassifierError) -> &mut Self {
        self.script.push_back(Err(error));
        self
    }

    /// Sets the result returned after the script is exhausted.
    pub fn with_fallback(mut self, poses: Vec<LandmarkSet>) -> Self {
        self.fallback = poses;
        self
    }

    /// Number of `classify` calls so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Returns true once `release` has been called.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl PoseClassifier for MockClassifier {
    fn classify(&mut self, _image: &RgbImage) -> Result<Vec<LandmarkSet>, ClassifierError> {
        if self.released {
            return Err(ClassifierError::NotLoaded("classifier released".into()));
        }
        self.calls += 1;
        self.script
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn release(&mut self) {
        self.released = true;
        tracing::info!(calls = self.calls, "MockClassifier released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Landmark;

    #[test]
    fn test_script_then_fallback() {
        let pose = LandmarkSet::upper_body(
            Landmark::new(0.5, 0.5, 1.0),
            Landmark::new(0.4, 0.7, 1.0),
            Landmark::new(0.6, 0.7, 1.0),
        );
        let mut classifier = MockClassifier::new();
        classifier
            .push_pose(pose.clone())
            .push_error(ClassifierError::Inference("boom".into()));

        let image = RgbImage::new(4, 4);
        assert_eq!(classifier.classify(&image).unwrap(), vec![pose]);
        assert!(classifier.classify(&image).is_err());
        assert!(classifier.classify(&image).unwrap().is_empty());
        assert_eq!(classifier.calls(), 3);

        classifier.release();
        assert!(classifier.is_released());
        assert!(matches!(
            classifier.classify(&image),
            Err(ClassifierError::NotLoaded(_))
        ));
    }
}
