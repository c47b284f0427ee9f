//! Engine run-time clock
//!
//! Run time is measured in seconds since the engine started. Resource
//! bookkeeping only ever asks "what time is it now", so the clock is a
//! one-method trait with a real and a manually driven implementation.

use std::cell::Cell;
use std::time::Instant;

use crate::config::EngineOptions;

/// Monotonic seconds since engine start
pub trait RunTime {
    fn run_time(&self) -> f64;
}

/// Wall-clock backed run time
#[derive(Debug, Clone, Copy)]
pub struct EngineClock {
    start: Instant,
}

impl EngineClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTime for EngineClock {
    fn run_time(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Run time that only moves when told to (tests, replays, offline tools)
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, time: f64) {
        self.now.set(time);
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl RunTime for ManualClock {
    fn run_time(&self) -> f64 {
        self.now.get()
    }
}

/// Clock plus options, handed to everything that used to reach for the engine
#[derive(Clone, Copy)]
pub struct EngineContext<'a> {
    pub clock: &'a dyn RunTime,
    pub options: &'a EngineOptions,
}

impl<'a> EngineContext<'a> {
    pub fn new(clock: &'a dyn RunTime, options: &'a EngineOptions) -> Self {
        Self { clock, options }
    }

    pub fn run_time(&self) -> f64 {
        self.clock.run_time()
    }
}

impl std::fmt::Debug for EngineContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("run_time", &self.clock.run_time())
            .field("options", self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_driven() {
        let clock = ManualClock::new(10.0);
        assert_eq!(clock.run_time(), 10.0);
        clock.advance(2.5);
        assert_eq!(clock.run_time(), 12.5);
        clock.set(1.0);
        assert_eq!(clock.run_time(), 1.0);
    }

    #[test]
    fn engine_clock_is_monotonic() {
        let clock = EngineClock::new();
        let a = clock.run_time();
        let b = clock.run_time();
        assert!(b >= a);
    }

    #[test]
    fn context_reads_through_clock() {
        let clock = ManualClock::new(3.0);
        let options = EngineOptions::default();
        let ctx = EngineContext::new(&clock, &options);
        clock.advance(1.0);
        assert_eq!(ctx.run_time(), 4.0);
    }
}
