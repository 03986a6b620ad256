// src/uplink/flags.rs

use core::fmt;

/// Which optional fields a payload carries. Byte 1 of every uplink.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct UplinkFlags(u8);

impl UplinkFlags {
    pub const BATTERY: u8 = 1 << 0;
    pub const BOOT: u8 = 1 << 1;
    pub const TEMP_HUMIDITY: u8 = 1 << 2;
    pub const CO2: u8 = 1 << 3;

    const ALL: u8 = Self::BATTERY | Self::BOOT | Self::TEMP_HUMIDITY | Self::CO2;

    pub const fn empty() -> Self {
        UplinkFlags(0)
    }

    /// Accepts only the four defined bits.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL == 0 {
            Some(UplinkFlags(bits))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, bit: u8) -> bool {
        self.0 & bit == bit
    }

    pub fn insert(&mut self, bit: u8) {
        self.0 |= bit & Self::ALL;
    }

    pub const fn battery(self) -> bool {
        self.contains(Self::BATTERY)
    }

    pub const fn boot(self) -> bool {
        self.contains(Self::BOOT)
    }

    pub const fn temp_humidity(self) -> bool {
        self.contains(Self::TEMP_HUMIDITY)
    }

    pub const fn co2(self) -> bool {
        self.contains(Self::CO2)
    }
}

impl fmt::Display for UplinkFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::BATTERY, "battery"),
            (Self::BOOT, "boot"),
            (Self::TEMP_HUMIDITY, "th"),
            (Self::CO2, "co2"),
        ];
        let mut first = true;
        for (bit, name) in names {
            if self.contains(bit) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// Operator-controlled switches, persisted by the host platform.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct OperatingFlags(u32);

impl OperatingFlags {
    /// Ask the network to acknowledge every uplink.
    pub const CONFIRMED_UPLINK: u32 = 1 << 0;
    /// Deployed without an operator: deep sleep is allowed.
    pub const UNATTENDED: u32 = 1 << 1;
    pub const DISABLE_DEEP_SLEEP: u32 = 1 << 2;
    /// Always deep sleep when sleeping at all, for bench testing.
    pub const DEEP_SLEEP_TEST: u32 = 1 << 3;

    pub const fn new(bits: u32) -> Self {
        OperatingFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn with(self, bit: u32) -> Self {
        OperatingFlags(self.0 | bit)
    }

    pub const fn without(self, bit: u32) -> Self {
        OperatingFlags(self.0 & !bit)
    }

    pub const fn contains(self, bit: u32) -> bool {
        self.0 & bit == bit
    }

    pub const fn confirmed_uplink(self) -> bool {
        self.contains(Self::CONFIRMED_UPLINK)
    }

    pub const fn unattended(self) -> bool {
        self.contains(Self::UNATTENDED)
    }

    pub const fn deep_sleep_disabled(self) -> bool {
        self.contains(Self::DISABLE_DEEP_SLEEP)
    }

    pub const fn deep_sleep_test(self) -> bool {
        self.contains(Self::DEEP_SLEEP_TEST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uplink_flag_bits_match_wire() {
        let mut f = UplinkFlags::empty();
        f.insert(UplinkFlags::BATTERY);
        f.insert(UplinkFlags::CO2);
        assert_eq!(f.bits(), 0b1001);
        assert!(f.battery() && f.co2());
        assert!(!f.boot() && !f.temp_humidity());
        assert_eq!(f.to_string(), "battery|co2");
        assert_eq!(UplinkFlags::empty().to_string(), "none");
    }

    #[test]
    fn test_unknown_bits_rejected() {
        assert_eq!(UplinkFlags::from_bits(0x0F).map(|f| f.bits()), Some(0x0F));
        assert!(UplinkFlags::from_bits(0x10).is_none());
        let mut f = UplinkFlags::empty();
        f.insert(0xF0);
        assert_eq!(f.bits(), 0);
    }

    #[test]
    fn test_operating_flags() {
        let f = OperatingFlags::default()
            .with(OperatingFlags::UNATTENDED)
            .with(OperatingFlags::CONFIRMED_UPLINK);
        assert!(f.unattended() && f.confirmed_uplink());
        assert!(!f.deep_sleep_disabled() && !f.deep_sleep_test());
        assert!(!f.without(OperatingFlags::UNATTENDED).unattended());
    }
}
