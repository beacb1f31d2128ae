//! Transition stopwatch.
//!
//! Built on `tokio::time::Instant`, so tests can pause and advance the
//! clock deterministically with `tokio::time::advance`.

use std::time::Duration;

use tokio::time::Instant;

/// A restartable stopwatch. A reset stopwatch is stopped and reads zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch {
    started: Option<Instant>,
}

impl Stopwatch {
    /// A stopped stopwatch reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes the stopwatch and starts it.
    pub fn restart(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stops the stopwatch and zeroes it.
    pub fn reset(&mut self) {
        self.started = None;
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Elapsed time in (fractional) milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}
