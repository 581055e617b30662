//! Background gesture scanning loop.
//!
//! The scanner runs on its own thread, independent of request handling.
//! It samples the shared camera, classifies every Nth frame and feeds the
//! result to a [`GestureDetector`]. Capture gestures call the orchestrator
//! synchronously, so the loop is blocked for the whole exposure and cannot
//! re-trigger while a gesture capture is running.

use super::{
    CaptureTrigger, GestureConfig, GestureDetector, GestureEvent, PoseClassifier,
};
use crate::capture::FrameSource;
use crate::state::RunState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// What a single scanner iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Scanning is disabled; no frame was pulled.
    Idle,
    /// The camera had no frame.
    NoFrame,
    /// Frame pulled but not selected for classification.
    Skipped,
    /// A recent trigger suppresses classification.
    CoolingDown,
    /// Frame classified; no gesture completed.
    Classified,
    /// The classifier failed; the error was logged.
    ClassifierFailed,
    /// A gesture completed and was acted upon.
    Fired(GestureEvent),
}

/// Running counters exported as metrics.
#[derive(Debug, Default)]
pub struct ScannerStats {
    samples: AtomicU64,
    classified: AtomicU64,
    classifier_errors: AtomicU64,
    captures_triggered: AtomicU64,
    trigger_failures: AtomicU64,
}

/// Point-in-time copy of [`ScannerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScannerStatsSnapshot {
    pub samples: u64,
    pub classified: u64,
    pub classifier_errors: u64,
    pub captures_triggered: u64,
    pub trigger_failures: u64,
}

impl ScannerStats {
    pub fn snapshot(&self) -> ScannerStatsSnapshot {
        ScannerStatsSnapshot {
            samples: self.samples.load(Ordering::Relaxed),
            classified: self.classified.load(Ordering::Relaxed),
            classifier_errors: self.classifier_errors.load(Ordering::Relaxed),
            captures_triggered: self.captures_triggered.load(Ordering::Relaxed),
            trigger_failures: self.trigger_failures.load(Ordering::Relaxed),
        }
    }
}

/// Gesture-recognition loop.
pub struct GestureScanner {
    source: Arc<dyn FrameSource>,
    classifier: Box<dyn PoseClassifier>,
    trigger: Arc<dyn CaptureTrigger>,
    state: Arc<RunState>,
    detector: GestureDetector,
    stats: Arc<ScannerStats>,
    sampled: u64,
}

impl GestureScanner {
    pub fn new(
        source: Arc<dyn FrameSource>,
        classifier: Box<dyn PoseClassifier>,
        trigger: Arc<dyn CaptureTrigger>,
        state: Arc<RunState>,
        config: GestureConfig,
    ) -> Self {
        Self {
            source,
            classifier,
            trigger,
            state,
            detector: GestureDetector::new(config),
            stats: Arc::new(ScannerStats::default()),
            sampled: 0,
        }
    }

    /// Returns a handle to the running counters.
    pub fn stats(&self) -> Arc<ScannerStats> {
        Arc::clone(&self.stats)
    }

    pub fn detector(&self) -> &GestureDetector {
        &self.detector
    }

    /// Runs one iteration of the loop.
    pub fn step(&mut self) -> Step {
        if !self.state.scanner_active() {
            return Step::Idle;
        }

        let Some(frame) = self.source.latest_frame() else {
            return Step::NoFrame;
        };
        self.sampled += 1;
        self.stats.samples.fetch_add(1, Ordering::Relaxed);

        let frame_skip = self.detector.config().frame_skip.max(1) as u64;
        if self.sampled % frame_skip != 0 {
            return Step::Skipped;
        }

        if self.detector.is_cooling_down(Instant::now()) {
            return Step::CoolingDown;
        }

        let config = self.detector.config();
        let Some(image) = frame
            .downscale(config.classify_width, config.classify_height)
            .and_then(|small| small.into_rgb_image())
        else {
            tracing::warn!(sequence = frame.sequence(), "Dropping malformed frame");
            return Step::NoFrame;
        };

        let landmarks = match self.classifier.classify(&image) {
            Ok(mut people) => {
                self.stats.classified.fetch_add(1, Ordering::Relaxed);
                (!people.is_empty()).then(|| people.swap_remove(0))
            }
            Err(e) => {
                self.stats.classifier_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Pose classification failed");
                self.detector.reset();
                return Step::ClassifierFailed;
            }
        };

        match self.detector.observe(landmarks.as_ref()) {
            Some(GestureEvent::Quit) => {
                tracing::info!("Quit gesture detected");
                self.state.request_quit();
                Step::Fired(GestureEvent::Quit)
            }
            Some(GestureEvent::Capture) => {
                self.fire_capture();
                Step::Fired(GestureEvent::Capture)
            }
            None => Step::Classified,
        }
    }

    fn fire_capture(&mut self) {
        let exposure_secs = self.detector.config().capture_exposure_secs;
        tracing::info!(exposure_secs, "Capture gesture detected");
        self.stats.captures_triggered.fetch_add(1, Ordering::Relaxed);

        match self.trigger.trigger(exposure_secs) {
            Ok(outcome) => {
                tracing::info!(frames = outcome.frames, "Gesture capture complete");
            }
            Err(e) => {
                self.stats.trigger_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Gesture capture failed");
            }
        }

        // Cooldown starts when the capture call returns, whatever its outcome.
        self.detector.start_cooldown(Instant::now());
    }

    /// Runs until shutdown is requested, then releases the classifier.
    pub fn run(mut self) {
        tracing::info!("Gesture scanner started");

        while !self.state.quit_requested() {
            let pause = match self.step() {
                Step::Idle => self.detector.config().idle_poll(),
                Step::Fired(GestureEvent::Quit) => break,
                _ => self.detector.config().sample_interval(),
            };
            if self.state.wait_for_quit_timeout(pause) {
                break;
            }
        }

        self.classifier.release();
        tracing::info!(stats = ?self.stats.snapshot(), "Gesture scanner stopped");
    }

    /// Moves the scanner onto a dedicated thread.
    pub fn spawn(self) -> std::io::Result<ScannerHandle> {
        let state = Arc::clone(&self.state);
        let stats = self.stats();
        let handle = thread::Builder::new()
            .name("gesture-scanner".into())
            .spawn(move || self.run())?;
        Ok(ScannerHandle {
            handle: Some(handle),
            state,
            stats,
        })
    }
}

/// Handle to a scanner running on its own thread.
#[derive(Debug)]
pub struct ScannerHandle {
    handle: Option<thread::JoinHandle<()>>,
    state: Arc<RunState>,
    stats: Arc<ScannerStats>,
}

impl ScannerHandle {
    /// Returns the scanner's running counters.
    pub fn stats(&self) -> Arc<ScannerStats> {
        Arc::clone(&self.stats)
    }

    /// Returns true once the scanner thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Waits for the scanner thread to exit.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Gesture scanner thread panicked");
            }
        }
    }

    /// Signals shutdown and waits for the scanner thread to exit.
    pub fn stop(self) {
        self.state.request_quit();
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use crate::exposure::{CaptureError, CaptureOutcome};
    use crate::gesture::{ClassifierError, Landmark, LandmarkSet, MockClassifier, TriggerError};
    use image::RgbImage;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Mutex;
    use std::time::Duration;

    struct CountingSource {
        pulls: AtomicUsize,
    }

    impl CountingSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                pulls: AtomicUsize::new(0),
            })
        }
    }

    impl FrameSource for CountingSource {
        fn latest_frame(&self) -> Option<Frame> {
            let n = self.pulls.fetch_add(1, Ordering::SeqCst);
            Some(Frame::filled(64, 48, [50, 50, 50], n as u64))
        }
    }

    /// Records trigger calls; optionally fails them.
    #[derive(Default)]
    struct RecordingTrigger {
        calls: Mutex<Vec<u32>>,
        fail: bool,
    }

    impl CaptureTrigger for RecordingTrigger {
        fn trigger(&self, exposure_secs: u32) -> Result<CaptureOutcome, TriggerError> {
            self.calls.lock().unwrap().push(exposure_secs);
            if self.fail {
                return Err(TriggerError::Rejected(CaptureError::Busy));
            }
            Ok(CaptureOutcome {
                path: "temp.jpg".into(),
                frames: 1,
                skipped: 0,
                width: 64,
                height: 48,
                exposure_secs,
            })
        }
    }

    /// Classifier returning the same pose forever and tracking release.
    struct FixedClassifier {
        pose: Option<LandmarkSet>,
        released: Arc<AtomicBool>,
        last_size: Arc<Mutex<(u32, u32)>>,
    }

    impl PoseClassifier for FixedClassifier {
        fn classify(&mut self, image: &RgbImage) -> Result<Vec<LandmarkSet>, ClassifierError> {
            *self.last_size.lock().unwrap() = image.dimensions();
            Ok(self.pose.iter().cloned().collect())
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn arms(left_up: bool, right_up: bool) -> LandmarkSet {
        let y = |up: bool| if up { 0.2 } else { 0.7 };
        LandmarkSet::upper_body(
            Landmark::new(0.5, 0.4, 0.9),
            Landmark::new(0.3, y(left_up), 0.9),
            Landmark::new(0.7, y(right_up), 0.9),
        )
    }

    fn every_frame() -> GestureConfig {
        GestureConfig {
            frame_skip: 1,
            sample_interval_ms: 1,
            idle_poll_ms: 5,
            ..Default::default()
        }
    }

    fn scanner(
        classifier: Box<dyn PoseClassifier>,
        trigger: Arc<RecordingTrigger>,
        config: GestureConfig,
    ) -> (Arc<RunState>, GestureScanner) {
        let state = Arc::new(RunState::with_scanner_active(true));
        let scanner = GestureScanner::new(
            CountingSource::new(),
            classifier,
            trigger,
            Arc::clone(&state),
            config,
        );
        (state, scanner)
    }

    #[test]
    fn test_inactive_scanner_does_not_pull_frames() {
        let source = CountingSource::new();
        let state = Arc::new(RunState::new());
        let mut scanner = GestureScanner::new(
            source.clone(),
            Box::new(MockClassifier::new()),
            Arc::new(RecordingTrigger::default()),
            Arc::clone(&state),
            every_frame(),
        );

        assert_eq!(scanner.step(), Step::Idle);
        assert_eq!(scanner.step(), Step::Idle);
        assert_eq!(source.pulls.load(Ordering::SeqCst), 0);

        state.set_scanner_active(true);
        assert_eq!(scanner.step(), Step::Classified);
        assert_eq!(source.pulls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_frame_skip_classifies_every_fifth() {
        let mut classifier = MockClassifier::new();
        for _ in 0..2 {
            classifier.push_empty();
        }
        let config = GestureConfig {
            frame_skip: 5,
            ..every_frame()
        };
        let (_state, mut scanner) =
            scanner(Box::new(classifier), Arc::new(RecordingTrigger::default()), config);

        let steps: Vec<Step> = (0..10).map(|_| scanner.step()).collect();
        let classified = steps.iter().filter(|&&s| s == Step::Classified).count();

        assert_eq!(classified, 2);
        assert_eq!(steps[4], Step::Classified);
        assert_eq!(steps[9], Step::Classified);
        assert_eq!(scanner.stats().snapshot().samples, 10);
    }

    #[test]
    fn test_frames_downscaled_before_classification() {
        let last_size = Arc::new(Mutex::new((0, 0)));
        let classifier = FixedClassifier {
            pose: None,
            released: Arc::new(AtomicBool::new(false)),
            last_size: Arc::clone(&last_size),
        };
        let config = GestureConfig {
            classify_width: 32,
            classify_height: 24,
            ..every_frame()
        };
        let (_state, mut scanner) =
            scanner(Box::new(classifier), Arc::new(RecordingTrigger::default()), config);

        scanner.step();
        assert_eq!(*last_size.lock().unwrap(), (32, 24));
    }

    #[test]
    fn test_capture_gesture_triggers_once_then_cools_down() {
        let classifier = FixedClassifier {
            pose: Some(arms(true, false)),
            released: Arc::new(AtomicBool::new(false)),
            last_size: Arc::new(Mutex::new((0, 0))),
        };
        let trigger = Arc::new(RecordingTrigger::default());
        let (_state, mut scanner) = scanner(Box::new(classifier), trigger.clone(), every_frame());

        assert_eq!(scanner.step(), Step::Classified);
        assert_eq!(scanner.step(), Step::Classified);
        assert_eq!(scanner.step(), Step::Fired(GestureEvent::Capture));
        assert_eq!(*trigger.calls.lock().unwrap(), vec![6]);

        // Qualifying frames keep arriving but the cooldown suppresses them
        for _ in 0..10 {
            assert_eq!(scanner.step(), Step::CoolingDown);
        }
        assert_eq!(trigger.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_trigger_still_cools_down() {
        let classifier = FixedClassifier {
            pose: Some(arms(false, true)),
            released: Arc::new(AtomicBool::new(false)),
            last_size: Arc::new(Mutex::new((0, 0))),
        };
        let trigger = Arc::new(RecordingTrigger {
            fail: true,
            ..Default::default()
        });
        let (state, mut scanner) = scanner(Box::new(classifier), trigger.clone(), every_frame());

        for _ in 0..3 {
            scanner.step();
        }
        assert_eq!(scanner.stats().snapshot().trigger_failures, 1);
        assert_eq!(scanner.step(), Step::CoolingDown);
        assert!(!state.quit_requested());
    }

    #[test]
    fn test_classifier_errors_are_swallowed() {
        let mut classifier = MockClassifier::new();
        classifier
            .push_pose(arms(true, false))
            .push_pose(arms(true, false))
            .push_error(ClassifierError::Inference("tensor shape".into()))
            .push_pose(arms(true, false));
        let trigger = Arc::new(RecordingTrigger::default());
        let (_state, mut scanner) = scanner(Box::new(classifier), trigger.clone(), every_frame());

        assert_eq!(scanner.step(), Step::Classified);
        assert_eq!(scanner.step(), Step::Classified);
        assert_eq!(scanner.step(), Step::ClassifierFailed);
        // The failure broke the streak, so the next raise starts over
        assert_eq!(scanner.step(), Step::Classified);
        assert!(trigger.calls.lock().unwrap().is_empty());
        assert_eq!(scanner.stats().snapshot().classifier_errors, 1);
    }

    #[test]
    fn test_quit_gesture_stops_loop_and_releases() {
        let released = Arc::new(AtomicBool::new(false));
        let classifier = FixedClassifier {
            pose: Some(arms(true, true)),
            released: Arc::clone(&released),
            last_size: Arc::new(Mutex::new((0, 0))),
        };
        let trigger = Arc::new(RecordingTrigger::default());
        let (state, scanner) = scanner(Box::new(classifier), trigger.clone(), every_frame());

        let handle = scanner.spawn().unwrap();
        assert!(state.wait_for_quit_timeout(Duration::from_secs(5)));
        handle.join();

        assert!(state.quit_requested());
        assert!(released.load(Ordering::SeqCst));
        assert!(trigger.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stop_handle_ends_idle_scanner() {
        let released = Arc::new(AtomicBool::new(false));
        let classifier = FixedClassifier {
            pose: None,
            released: Arc::clone(&released),
            last_size: Arc::new(Mutex::new((0, 0))),
        };
        let (state, scanner) = scanner(
            Box::new(classifier),
            Arc::new(RecordingTrigger::default()),
            every_frame(),
        );
        state.set_scanner_active(false);

        let handle = scanner.spawn().unwrap();
        handle.stop();
        assert!(released.load(Ordering::SeqCst));
    }
}
