//! Rate-limiting pauses between network-bound steps.

use parking_lot::Mutex;
use std::thread::sleep;
use std::time::Duration;

/// Closed range of seconds to pause for; the actual pause is drawn uniformly from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayWindow {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayWindow {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub const fn none() -> Self {
        Self { min_secs: 0.0, max_secs: 0.0 }
    }

    pub fn sample(&self) -> Duration {
        let lo = self.min_secs.max(0.0);
        let hi = self.max_secs.max(lo);
        Duration::from_secs_f64(lo + fastrand::f64() * (hi - lo))
    }
}

/// Pause lengths used by the crawl.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PacingPolicy {
    /// After each top-level comment (and its replies).
    pub per_comment: DelayWindow,
    /// After each post that produced rows.
    pub per_post: DelayWindow,
    /// After a post failed.
    pub cooldown: DelayWindow,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            per_comment: DelayWindow::new(1.0, 3.0),
            per_post: DelayWindow::new(10.0, 20.0),
            cooldown: DelayWindow::new(30.0, 60.0),
        }
    }
}

impl PacingPolicy {
    pub fn disabled() -> Self {
        Self { per_comment: DelayWindow::none(), per_post: DelayWindow::none(), cooldown: DelayWindow::none() }
    }
}

pub trait Pacer {
    fn pause(&self, window: DelayWindow);
}

/// Blocks the current thread for a jittered duration.
#[derive(Default, Clone, Copy)]
pub struct SleepPacer;

impl Pacer for SleepPacer {
    fn pause(&self, window: DelayWindow) {
        let d = window.sample();
        if !d.is_zero() {
            tracing::debug!(secs = d.as_secs_f64(), "pausing");
            sleep(d);
        }
    }
}

/// Records requested pauses without sleeping.
#[derive(Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<DelayWindow>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<DelayWindow> {
        self.pauses.lock().clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, window: DelayWindow) {
        self.pauses.lock().push(window);
    }
}
