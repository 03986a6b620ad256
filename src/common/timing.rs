// src/common/timing.rs

// All times are milliseconds on a wrapping u32 clock. Comparisons go through
// signed subtraction so they stay correct across the 49.7 day wraparound.

// === Bus Timing ===

/// Delay between writing a command and reading its response.
pub const READ_DELAY_MS: u32 = 3;
/// Recovery time the device needs after a command before the next one.
pub const COMMAND_RECOVERY_MS: u32 = 20;

// === Measurement Cadence ===

/// Shortest measurement interval the device accepts, in seconds.
pub const MEASUREMENT_INTERVAL_MIN_S: u16 = 2;
/// Longest measurement interval the device accepts, in seconds.
pub const MEASUREMENT_INTERVAL_MAX_S: u16 = 1800;
/// Extra grace after a cold start before a missing reading forces a start command.
pub const WARMUP_GRACE_MS: u32 = 500;
/// Retry delay after a failed data-ready read or a failed start command.
pub const ERROR_RETRY_MS: u32 = 1000;
/// Retry delay while measuring but the data-ready flag is still clear.
pub const READY_POLL_RETRY_MS: u32 = 100;

// === Uplink Cadence ===

/// Settle time in the Wake state before measuring.
pub const WAKE_SETTLE_MS: u32 = 20;
/// Wake from Sleeping once the next reading is this close.
pub const WAKE_LEAD_MS: u32 = 50;
/// Only consider sleeping when at least this much time remains.
pub const SLEEP_WORTHWHILE_MS: u32 = 1500;
/// Below this many seconds deep sleep is never chosen.
pub const DEEP_SLEEP_MIN_S: u32 = 2;

/// Returns `true` once `now` has reached or passed `deadline`.
#[inline]
pub const fn deadline_reached(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// Milliseconds from `now` until `deadline`, clamped to zero once it has passed.
#[inline]
pub const fn ms_until(now: u32, deadline: u32) -> u32 {
    let delta = deadline.wrapping_sub(now) as i32;
    if delta < 0 {
        0
    } else {
        delta as u32
    }
}

/// One measurement interval, in milliseconds.
#[inline]
pub const fn interval_ms(interval_s: u16) -> u32 {
    interval_s as u32 * 1000
}

/// A periodic timer on the wrapping millisecond clock.
///
/// Fires once per period; consuming a tick advances the start by whole periods
/// so a late check does not drift the cadence.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CycleTimer {
    start: u32,
    period_ms: u32,
}

impl CycleTimer {
    pub const fn new(now: u32, period_ms: u32) -> Self {
        Self { start: now, period_ms }
    }

    pub const fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Restarts the current period at `now`.
    pub fn retrigger(&mut self, now: u32) {
        self.start = now;
    }

    /// Changes the period and restarts at `now`.
    pub fn set_period(&mut self, now: u32, period_ms: u32) {
        self.period_ms = period_ms;
        self.start = now;
    }

    pub fn is_ready(&self, now: u32) -> bool {
        deadline_reached(now, self.start.wrapping_add(self.period_ms))
    }

    /// Milliseconds left in the current period.
    pub fn remaining(&self, now: u32) -> u32 {
        ms_until(now, self.start.wrapping_add(self.period_ms))
    }

    /// Consumes a tick if one is due. Returns whether a tick was consumed.
    pub fn take_tick(&mut self, now: u32) -> bool {
        if !self.is_ready(now) {
            return false;
        }
        if self.period_ms == 0 {
            self.start = now;
            return true;
        }
        let elapsed = now.wrapping_sub(self.start);
        self.start = self
            .start
            .wrapping_add(elapsed - elapsed % self.period_ms);
        true
    }
}
