use std::time::Instant;

use crate::foundation::core::Fps;

/// Millisecond time source for playback.
///
/// Interactive sessions read a [`SystemClock`]; exports step a [`VirtualClock`] so frame timing
/// never depends on wall-clock jitter.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Tick-counting clock: `now = ticks * 1000 / fps`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VirtualClock {
    fps: Fps,
    ticks: u64,
}

impl VirtualClock {
    pub fn new(fps: Fps) -> Self {
        Self { fps, ticks: 0 }
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn advance(&mut self) {
        self.ticks += 1;
    }

    pub fn seek(&mut self, ticks: u64) {
        self.ticks = ticks;
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> f64 {
        self.fps.ticks_to_ms(self.ticks)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/clock.rs"]
mod tests;
