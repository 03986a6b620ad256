// src/uplink/config.rs

use super::flags::OperatingFlags;
use super::payload::DEFAULT_FORMAT_ID;
use crate::common::timing::{SLEEP_WORTHWHILE_MS, WAKE_LEAD_MS, WAKE_SETTLE_MS};

/// Default LoRaWAN port for measurement uplinks.
pub const DEFAULT_PORT: u8 = 1;

/// What decides when a sleeping cycle wakes up again.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum WakePolicy {
    /// Wake when the sensor's next reading is due.
    SensorInterval,
    /// Wake on a fixed uplink cycle, independent of the sensor cadence.
    FixedCycle {
        /// Seconds between uplinks.
        period_secs: u32,
    },
}

/// Runtime configuration of the uplink orchestrator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UplinkConfig {
    /// First byte of every payload.
    pub format_id: u8,
    /// Port the payload is sent on.
    pub port: u8,
    /// Settle time in `Wake` before measuring, ms.
    pub settle_ms: u32,
    /// Wake this long before the next reading is due, ms.
    pub wake_lead_ms: u32,
    /// Sleep only when at least this long remains, ms.
    pub sleep_threshold_ms: u32,
    pub wake_policy: WakePolicy,
    pub flags: OperatingFlags,
}

impl UplinkConfig {
    /// Creates a configuration with the given format id and port and default timings.
    ///
    /// # Arguments
    ///
    /// * `format_id` - Payload format identifier.
    /// * `port` - Uplink port.
    pub fn new(format_id: u8, port: u8) -> Self {
        UplinkConfig {
            format_id,
            port,
            ..Self::default()
        }
    }

    pub fn format_id(mut self, format_id: u8) -> Self {
        self.format_id = format_id;
        self
    }

    pub fn port(mut self, port: u8) -> Self {
        self.port = port;
        self
    }

    pub fn settle_ms(mut self, ms: u32) -> Self {
        self.settle_ms = ms;
        self
    }

    pub fn wake_lead_ms(mut self, ms: u32) -> Self {
        self.wake_lead_ms = ms;
        self
    }

    pub fn sleep_threshold_ms(mut self, ms: u32) -> Self {
        self.sleep_threshold_ms = ms;
        self
    }

    /// Sets the wake policy.
    ///
    /// # Arguments
    ///
    /// * `policy` - `SensorInterval` follows the sensor; `FixedCycle` uplinks
    ///   on its own cadence.
    pub fn wake_policy(mut self, policy: WakePolicy) -> Self {
        self.wake_policy = policy;
        self
    }

    pub fn flags(mut self, flags: OperatingFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl Default for UplinkConfig {
    /// Format id 0x1F on port 1, waking with the sensor, no operating flags.
    fn default() -> UplinkConfig {
        UplinkConfig {
            format_id: DEFAULT_FORMAT_ID,
            port: DEFAULT_PORT,
            settle_ms: WAKE_SETTLE_MS,
            wake_lead_ms: WAKE_LEAD_MS,
            sleep_threshold_ms: SLEEP_WORTHWHILE_MS,
            wake_policy: WakePolicy::SensorInterval,
            flags: OperatingFlags::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = UplinkConfig::default();
        assert_eq!(c.format_id, 0x1F);
        assert_eq!(c.port, 1);
        assert_eq!(c.settle_ms, 20);
        assert_eq!(c.wake_policy, WakePolicy::SensorInterval);
    }

    #[test]
    fn test_builder() {
        let c = UplinkConfig::new(0x20, 2)
            .settle_ms(50)
            .wake_policy(WakePolicy::FixedCycle { period_secs: 360 })
            .flags(OperatingFlags::new(OperatingFlags::UNATTENDED));
        assert_eq!(c.format_id, 0x20);
        assert_eq!(c.port, 2);
        assert_eq!(c.settle_ms, 50);
        assert_eq!(c.sleep_threshold_ms, 1500);
        assert!(c.flags.unattended());
    }
}
