// src/scheduler/time_interface.rs - Millisecond clocks for hold-time measurement
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Monotonic milliseconds since start, as a fixed-width counter that wraps
/// after ~49.7 days. Compare readings with [`elapsed_ms`], never with `<`.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u32;
}

/// Milliseconds from `since` to `now`, correct across one counter wraparound.
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Standard clock using std::time::Instant.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_millis(&self) -> u32 {
        // Truncation keeps the low 32 bits, i.e. the wrapped counter.
        self.start.elapsed().as_millis() as u32
    }
}

/// Clock advanced by hand. Clones share the same counter, so a test (or the
/// simulated plant) can hold one handle while the control loop owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_ms)),
        }
    }

    /// Move time forward, wrapping at `u32::MAX`.
    pub fn advance(&self, ms: u32) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}
