//! Wrist/nose gesture state machine.
//!
//! Two gestures are recognized from a single person's landmarks:
//!
//! - **Quit**: both wrists above the nose.
//! - **Capture**: exactly one wrist above the nose.
//!
//! Each gesture has its own hysteresis counter and fires only after
//! `required_streak` consecutive qualifying samples. Quit takes priority:
//! a two-arm sample never advances the capture counter.

use super::{GestureConfig, LandmarkSet, PoseLandmark};
use std::time::Instant;

/// A gesture that completed its hysteresis streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    /// Both arms raised; shut the appliance down.
    Quit,
    /// One arm raised; take a photo.
    Capture,
}

/// Per-sample classification of a landmark set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pose {
    /// Nobody detected.
    Absent,
    /// Keypoints too uncertain or subject badly framed.
    Unreliable,
    /// Both wrists above the nose.
    BothArmsUp,
    /// Exactly one wrist above the nose.
    OneArmUp,
    /// Neither wrist above the nose.
    Neutral,
}

/// Hysteresis and cooldown tracking for the gesture scanner.
#[derive(Debug)]
pub struct GestureDetector {
    config: GestureConfig,
    quit_streak: u32,
    capture_streak: u32,
    cooldown_until: Option<Instant>,
}

impl GestureDetector {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            quit_streak: 0,
            capture_streak: 0,
            cooldown_until: None,
        }
    }

    /// Classifies a landmark set without touching any counters.
    pub fn pose_of(&self, landmarks: Option<&LandmarkSet>) -> Pose {
        let Some(landmarks) = landmarks else {
            return Pose::Absent;
        };
        let (Some(nose), Some(left), Some(right)) = (
            landmarks.get(PoseLandmark::Nose),
            landmarks.get(PoseLandmark::LeftWrist),
            landmarks.get(PoseLandmark::RightWrist),
        ) else {
            return Pose::Unreliable;
        };

        let min = self.config.min_visibility;
        let confident = nose.visibility > min && left.visibility > min && right.visibility > min;
        if !confident || nose.y >= self.config.max_nose_y {
            return Pose::Unreliable;
        }

        // Image y grows downward: "above" means a smaller y.
        let left_up = left.y < nose.y;
        let right_up = right.y < nose.y;
        match (left_up, right_up) {
            (true, true) => Pose::BothArmsUp,
            (true, false) | (false, true) => Pose::OneArmUp,
            (false, false) => Pose::Neutral,
        }
    }

    /// Feeds one classified sample through the hysteresis counters.
    ///
    /// `None` means the classifier found nobody, which resets both counters.
    pub fn observe(&mut self, landmarks: Option<&LandmarkSet>) -> Option<GestureEvent> {
        let pose = self.pose_of(landmarks);
        let event = self.advance(pose);
        tracing::trace!(
            ?pose,
            quit_streak = self.quit_streak,
            capture_streak = self.capture_streak,
            "Gesture sample"
        );
        event
    }

    fn advance(&mut self, pose: Pose) -> Option<GestureEvent> {
        let required = self.config.required_streak;
        match pose {
            Pose::BothArmsUp => {
                self.capture_streak = 0;
                self.quit_streak += 1;
                if self.quit_streak >= required {
                    self.reset();
                    return Some(GestureEvent::Quit);
                }
                None
            }
            Pose::OneArmUp => {
                self.quit_streak = 0;
                self.capture_streak += 1;
                if self.capture_streak >= required {
                    self.capture_streak = 0;
                    return Some(GestureEvent::Capture);
                }
                None
            }
            Pose::Absent | Pose::Unreliable | Pose::Neutral => {
                self.reset();
                None
            }
        }
    }

    /// Clears both hysteresis counters.
    pub fn reset(&mut self) {
        self.quit_streak = 0;
        self.capture_streak = 0;
    }

    /// Returns true while gesture evaluation is suppressed.
    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }

    /// Suppresses gesture evaluation for the configured cooldown from `now`.
    pub fn start_cooldown(&mut self, now: Instant) {
        self.cooldown_until = Some(now + self.config.cooldown());
        self.capture_streak = 0;
    }

    pub fn quit_streak(&self) -> u32 {
        self.quit_streak
    }

    pub fn capture_streak(&self) -> u32 {
        self.capture_streak
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Landmark;
    use std::time::Duration;

    const NOSE_Y: f32 = 0.4;
    const UP: f32 = 0.2;
    const DOWN: f32 = 0.7;

    fn pose(left_y: f32, right_y: f32) -> LandmarkSet {
        LandmarkSet::upper_body(
            Landmark::new(0.5, NOSE_Y, 0.9),
            Landmark::new(0.35, left_y, 0.9),
            Landmark::new(0.65, right_y, 0.9),
        )
    }

    fn detector() -> GestureDetector {
        GestureDetector::new(GestureConfig::default())
    }

    #[test]
    fn test_pose_classification() {
        let d = detector();
        assert_eq!(d.pose_of(None), Pose::Absent);
        assert_eq!(d.pose_of(Some(&pose(UP, UP))), Pose::BothArmsUp);
        assert_eq!(d.pose_of(Some(&pose(UP, DOWN))), Pose::OneArmUp);
        assert_eq!(d.pose_of(Some(&pose(DOWN, UP))), Pose::OneArmUp);
        assert_eq!(d.pose_of(Some(&pose(DOWN, DOWN))), Pose::Neutral);
    }

    #[test]
    fn test_low_visibility_unreliable() {
        let d = detector();
        let set = LandmarkSet::upper_body(
            Landmark::new(0.5, NOSE_Y, 0.9),
            Landmark::new(0.35, UP, 0.3), // must exceed, not equal, the threshold
            Landmark::new(0.65, UP, 0.9),
        );
        assert_eq!(d.pose_of(Some(&set)), Pose::Unreliable);
    }

    #[test]
    fn test_badly_framed_unreliable() {
        let d = detector();
        let set = LandmarkSet::upper_body(
            Landmark::new(0.5, 0.9, 0.9),
            Landmark::new(0.35, 0.5, 0.9),
            Landmark::new(0.65, 0.95, 0.9),
        );
        assert_eq!(d.pose_of(Some(&set)), Pose::Unreliable);
    }

    #[test]
    fn test_capture_needs_three_consecutive() {
        let mut d = detector();
        let raise = pose(UP, DOWN);

        assert_eq!(d.observe(Some(&raise)), None);
        assert_eq!(d.observe(Some(&raise)), None);
        assert_eq!(d.observe(Some(&raise)), Some(GestureEvent::Capture));
        assert_eq!(d.capture_streak(), 0);
    }

    #[test]
    fn test_quit_needs_three_consecutive() {
        let mut d = detector();
        let both = pose(UP, UP);

        assert_eq!(d.observe(Some(&both)), None);
        assert_eq!(d.observe(Some(&both)), None);
        assert_eq!(d.observe(Some(&both)), Some(GestureEvent::Quit));
        assert_eq!(d.quit_streak(), 0);
        assert_eq!(d.capture_streak(), 0);
    }

    #[test]
    fn test_interruption_resets_streak() {
        let mut d = detector();
        let raise = pose(UP, DOWN);

        d.observe(Some(&raise));
        d.observe(Some(&raise));
        assert_eq!(d.observe(Some(&pose(DOWN, DOWN))), None);
        assert_eq!(d.capture_streak(), 0);

        d.observe(Some(&raise));
        d.observe(Some(&raise));
        assert_eq!(d.observe(None), None);
        assert_eq!(d.capture_streak(), 0);

        assert_eq!(d.observe(Some(&raise)), None);
        assert_eq!(d.observe(Some(&raise)), None);
        assert_eq!(d.observe(Some(&raise)), Some(GestureEvent::Capture));
    }

    #[test]
    fn test_both_arms_never_count_as_capture() {
        let mut d = detector();
        let raise = pose(UP, DOWN);
        let both = pose(UP, UP);

        d.observe(Some(&raise));
        d.observe(Some(&raise));
        assert_eq!(d.observe(Some(&both)), None);
        assert_eq!(d.capture_streak(), 0);
        assert_eq!(d.quit_streak(), 1);

        // A one-arm sample breaks the quit streak in turn
        assert_eq!(d.observe(Some(&raise)), None);
        assert_eq!(d.quit_streak(), 0);
        assert_eq!(d.capture_streak(), 1);
    }

    #[test]
    fn test_cooldown_window() {
        let mut d = detector();
        let now = Instant::now();

        assert!(!d.is_cooling_down(now));
        d.start_cooldown(now);
        assert!(d.is_cooling_down(now));
        assert!(d.is_cooling_down(now + Duration::from_secs(5)));
        assert!(!d.is_cooling_down(now + Duration::from_secs(6)));
    }
}
