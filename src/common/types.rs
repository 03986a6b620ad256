// src/common/types.rs

use core::fmt;

use super::timing::MEASUREMENT_INTERVAL_MIN_S;

// --- Measurement ---

/// One complete reading from the sensor.
///
/// Only ever produced by a successful fetch, and replaced as a whole.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Measurement {
    /// CO2 concentration in ppm.
    pub co2_ppm: f32,
    /// Temperature in °C.
    pub temperature: f32,
    /// Relative humidity in %.
    pub relative_humidity: f32,
}

impl Measurement {
    /// Builds a measurement from the six big-endian words of a read-measurement response.
    pub fn from_words(words: &[u16; 6]) -> Self {
        Self {
            co2_ppm: float_from_words(words[0], words[1]),
            temperature: float_from_words(words[2], words[3]),
            relative_humidity: float_from_words(words[4], words[5]),
        }
    }
}

/// Mask selecting the IEEE-754 single precision exponent bits.
const F32_EXPONENT_MASK: u32 = 0x7F80_0000;
/// Mask keeping sign and exponent.
const F32_SIGN_EXPONENT_MASK: u32 = 0xFF80_0000;

/// Reassembles a float sent as two big-endian words (high word first).
///
/// NaN and infinity (all exponent bits set) become `0.0`; denormals (no
/// exponent bits set) become a zero of the same sign. Both checks inspect the
/// bit pattern, never the numeric value.
pub fn float_from_words(high: u16, low: u16) -> f32 {
    let mut bits = (u32::from(high) << 16) | u32::from(low);

    if bits & F32_EXPONENT_MASK == F32_EXPONENT_MASK {
        return 0.0;
    }
    if bits & F32_EXPONENT_MASK == 0 {
        bits &= F32_SIGN_EXPONENT_MASK;
    }
    f32::from_bits(bits)
}

// --- Product Info ---

/// Device settings read once at start, refreshed only by confirmed setters.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProductInfo {
    /// Firmware version word (major in the high byte).
    pub firmware_version: u16,
    /// Measurement interval in seconds, 2..=1800.
    pub measurement_interval: u16,
    /// Automatic self calibration enabled.
    pub auto_self_calibration: bool,
    /// Forced recalibration reference in ppm.
    pub forced_recalibration_value: u16,
    /// Temperature offset in 0.01 °C.
    pub temperature_offset: i16,
    /// Altitude compensation in meters.
    pub altitude_compensation: i16,
}

impl Default for ProductInfo {
    fn default() -> Self {
        Self {
            firmware_version: 0,
            measurement_interval: MEASUREMENT_INTERVAL_MIN_S,
            auto_self_calibration: false,
            forced_recalibration_value: 0,
            temperature_offset: 0,
            altitude_compensation: 0,
        }
    }
}

impl ProductInfo {
    pub const fn firmware_major(&self) -> u8 {
        (self.firmware_version >> 8) as u8
    }

    pub const fn firmware_minor(&self) -> u8 {
        self.firmware_version as u8
    }
}

// --- Sensor State ---

/// Lifecycle of the driver. Ordered: everything after `End` counts as running.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum SensorState {
    /// Never started successfully.
    Uninitialized,
    /// Started, then explicitly stopped.
    End,
    /// Just started, device mode unknown.
    Initial,
    /// Running but not measuring.
    Idle,
    /// Continuous measurement running, no unfetched reading.
    Triggered,
    /// Continuous measurement running, an unfetched reading exists.
    Ready,
}

impl SensorState {
    pub const fn is_running(self) -> bool {
        !matches!(self, SensorState::Uninitialized | SensorState::End)
    }

    pub const fn name(self) -> &'static str {
        match self {
            SensorState::Uninitialized => "Uninitialized",
            SensorState::End => "End",
            SensorState::Initial => "Initial",
            SensorState::Idle => "Idle",
            SensorState::Triggered => "Triggered",
            SensorState::Ready => "Ready",
        }
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(v: f32) -> (u16, u16) {
        let bits = v.to_bits();
        ((bits >> 16) as u16, bits as u16)
    }

    #[test]
    fn test_float_reassembly() {
        let (h, l) = split(412.5);
        assert_eq!(float_from_words(h, l), 412.5);
        let (h, l) = split(-12.25);
        assert_eq!(float_from_words(h, l), -12.25);
    }

    #[test]
    fn test_nan_and_infinity_map_to_zero() {
        assert_eq!(float_from_words(0x7FC0, 0x0000).to_bits(), 0);
        assert_eq!(float_from_words(0xFF80, 0x0000).to_bits(), 0);
        assert_eq!(float_from_words(0x7F80, 0x0001).to_bits(), 0);
    }

    #[test]
    fn test_denormals_map_to_signed_zero() {
        assert_eq!(float_from_words(0x0000, 0x0001).to_bits(), 0x0000_0000);
        assert_eq!(float_from_words(0x8040, 0x0000).to_bits(), 0x8000_0000);
    }

    #[test]
    fn test_measurement_word_order() {
        let (c0, c1) = split(800.0);
        let (t0, t1) = split(21.5);
        let (h0, h1) = split(45.25);
        let m = Measurement::from_words(&[c0, c1, t0, t1, h0, h1]);
        assert_eq!(m.co2_ppm, 800.0);
        assert_eq!(m.temperature, 21.5);
        assert_eq!(m.relative_humidity, 45.25);
    }

    #[test]
    fn test_running_states() {
        assert!(!SensorState::Uninitialized.is_running());
        assert!(!SensorState::End.is_running());
        assert!(SensorState::Initial.is_running());
        assert!(SensorState::Ready.is_running());
        assert_eq!(SensorState::Triggered.to_string(), "Triggered");
    }
}
