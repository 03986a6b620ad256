// src/uplink/sleep.rs

use crate::common::timing::DEEP_SLEEP_MIN_S;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SleepDepth {
    /// Short idle wait; peripherals keep their state.
    Light,
    /// Whole-system suspend; bus and sensor need a restart afterwards.
    Deep,
}

/// Inputs to the sleep-depth choice besides the remaining time.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SleepEnvironment {
    pub deep_sleep_test: bool,
    pub console_attached: bool,
    pub deep_sleep_disabled: bool,
    pub unattended: bool,
}

/// Picks the sleep depth for `remaining_secs` until the next wake.
///
/// Rules, first match wins: under [`DEEP_SLEEP_MIN_S`] always light; test mode
/// deep; an attached console light; deep sleep disabled light; unattended deep;
/// otherwise light.
pub fn choose_sleep_depth(remaining_secs: u32, env: &SleepEnvironment) -> SleepDepth {
    if remaining_secs < DEEP_SLEEP_MIN_S {
        SleepDepth::Light
    } else if env.deep_sleep_test {
        SleepDepth::Deep
    } else if env.console_attached || env.deep_sleep_disabled {
        SleepDepth::Light
    } else if env.unattended {
        SleepDepth::Deep
    } else {
        SleepDepth::Light
    }
}
