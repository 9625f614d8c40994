//! Fixed-rate tick pacing.

use std::thread;
use std::time::{Duration, Instant};

/// Paces the simulation at a fixed tick rate and stamps each tick with the
/// whole seconds elapsed since the start.
///
/// If a tick overruns by more than one interval the schedule is re-anchored
/// instead of bursting to catch up.
#[derive(Debug, Clone, Copy)]
pub struct SimulationClock {
    start: Instant,
    interval: Duration,
    next: Instant,
    ticks: u64,
}

impl SimulationClock {
    /// Start a clock now.
    #[must_use]
    pub fn start(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            interval,
            next: now,
            ticks: 0,
        }
    }

    /// Tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks handed out so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Wall-clock time since the start.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whole seconds since the start, saturating at `u32::MAX`.
    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        u32::try_from(self.elapsed().as_secs()).unwrap_or(u32::MAX)
    }

    /// Sleep until the next tick is due and return its elapsed seconds.
    pub fn wait_tick(&mut self) -> u32 {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
            self.next += self.interval;
        } else if now - self.next > self.interval {
            self.next = now + self.interval;
        } else {
            self.next += self.interval;
        }
        self.ticks += 1;
        self.elapsed_secs()
    }
}
