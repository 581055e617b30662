//! Process-wide run state shared by the HTTP handlers and the gesture scanner.
//!
//! All four flags live behind one mutex, so every transition (and every
//! read that a transition depends on) happens as a single atomic step.
//! The state is passed around as `Arc<RunState>`; there are no globals.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Copy of all run flags taken under the lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSnapshot {
    /// Gesture scanning is enabled.
    pub scanner_active: bool,
    /// A capture is currently accumulating frames or stacking.
    pub capture_in_progress: bool,
    /// A stacked image is waiting in the temporary slot.
    pub capture_done: bool,
    /// Shutdown was requested; long-running loops must exit.
    pub quit_requested: bool,
}

/// Shared run state.
#[derive(Debug, Default)]
pub struct RunState {
    flags: Mutex<RunSnapshot>,
    quit: Condvar,
}

impl RunState {
    /// Creates a state with every flag cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state with gesture scanning already enabled.
    pub fn with_scanner_active(active: bool) -> Self {
        let state = Self::new();
        state.set_scanner_active(active);
        state
    }

    fn lock(&self) -> MutexGuard<'_, RunSnapshot> {
        // Flags are plain booleans; a panic elsewhere cannot leave them torn.
        match self.flags.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Returns a consistent copy of all flags.
    pub fn snapshot(&self) -> RunSnapshot {
        *self.lock()
    }

    /// Marks a capture as in progress if none is running.
    ///
    /// The check and the set happen under one lock acquisition. Returns
    /// `None` when another capture already holds the slot. The returned
    /// guard clears the flag when dropped.
    pub fn try_begin_capture(&self) -> Option<CaptureGuard<'_>> {
        let mut flags = self.lock();
        if flags.capture_in_progress {
            return None;
        }
        flags.capture_in_progress = true;
        Some(CaptureGuard { state: self })
    }

    /// Returns true while a capture holds the busy slot.
    pub fn capture_in_progress(&self) -> bool {
        self.lock().capture_in_progress
    }

    /// Returns true if a stacked image awaits keep/discard.
    pub fn capture_done(&self) -> bool {
        self.lock().capture_done
    }

    /// Sets or clears the pending-result flag.
    pub fn set_capture_done(&self, done: bool) {
        self.lock().capture_done = done;
    }

    /// Returns true if gesture scanning is enabled.
    pub fn scanner_active(&self) -> bool {
        self.lock().scanner_active
    }

    /// Enables or disables gesture scanning.
    pub fn set_scanner_active(&self, active: bool) {
        let mut flags = self.lock();
        if flags.scanner_active != active {
            tracing::info!(active, "Gesture scanner toggled");
        }
        flags.scanner_active = active;
    }

    /// Returns true once shutdown has been requested.
    pub fn quit_requested(&self) -> bool {
        self.lock().quit_requested
    }

    /// Requests shutdown and wakes every thread blocked in [`wait_for_quit`].
    ///
    /// [`wait_for_quit`]: RunState::wait_for_quit
    pub fn request_quit(&self) {
        let mut flags = self.lock();
        if !flags.quit_requested {
            tracing::info!("Shutdown requested");
        }
        flags.quit_requested = true;
        self.quit.notify_all();
    }

    /// Blocks until shutdown is requested.
    pub fn wait_for_quit(&self) {
        let mut flags = self.lock();
        while !flags.quit_requested {
            flags = match self.quit.wait(flags) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Blocks until shutdown is requested or `timeout` elapses.
    ///
    /// Returns true if shutdown was requested.
    pub fn wait_for_quit_timeout(&self, timeout: Duration) -> bool {
        let flags = self.lock();
        let (flags, _) = match self
            .quit
            .wait_timeout_while(flags, timeout, |f| !f.quit_requested)
        {
            Ok(result) => result,
            Err(poisoned) => poisoned.into_inner(),
        };
        flags.quit_requested
    }
}

/// Holds the capture busy slot; releases it on drop.
///
/// Dropping happens on every exit path of a capture, including early
/// returns and unwinding panics.
#[derive(Debug)]
pub struct CaptureGuard<'a> {
    state: &'a RunState,
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().capture_in_progress = false;
    }
}
