//! SCD30 I2C command definitions.
//!
//! Every command is a 16-bit big-endian code. Commands that take an argument
//! append a 16-bit big-endian parameter followed by the CRC-8 of the two
//! parameter bytes.

use arrayvec::ArrayVec;

use super::crc::encode_group;

/// Longest frame ever written: 2 command bytes + 2 parameter bytes + CRC.
pub const MAX_FRAME_LEN: usize = 5;

/// A formatted command, ready to be written to the bus.
pub type CommandFrame = ArrayVec<u8, MAX_FRAME_LEN>;

/// Represents an SCD30 command.
///
/// Several codes double as "get" (no parameter) and "set" (with parameter)
/// operations on the same register.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u16)]
pub enum Command {
    /// Start continuous measurement; parameter is ambient pressure in mbar (0 = none).
    StartContinuousMeasurement = 0x0010,
    /// Stop continuous measurement.
    StopContinuousMeasurement = 0x0104,
    /// Read the data-ready status word.
    GetDataReady = 0x0202,
    /// Read CO2, temperature and humidity (6 groups).
    ReadMeasurement = 0x0300,
    /// Get/set the measurement interval in seconds.
    MeasurementInterval = 0x4600,
    /// Get/set altitude compensation in meters.
    AltitudeCompensation = 0x5102,
    /// Get/set the forced recalibration reference in ppm.
    ForcedRecalibration = 0x5204,
    /// Get/set automatic self calibration (0 or 1).
    AutoSelfCalibration = 0x5306,
    /// Get/set the temperature offset in 0.01 °C.
    TemperatureOffset = 0x5403,
    /// Read the firmware version word.
    ReadFirmwareVersion = 0xD100,
    /// Soft reset.
    SoftReset = 0xD304,
}

impl Command {
    /// Returns the 16-bit command code.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Formats the command without a parameter (2-byte frame).
    pub fn encode(self) -> CommandFrame {
        let mut frame = CommandFrame::new();
        frame.extend(self.code().to_be_bytes());
        frame
    }

    /// Formats the command with a 16-bit parameter (5-byte frame).
    pub fn encode_with(self, param: u16) -> CommandFrame {
        let mut frame = self.encode();
        frame.extend(encode_group(param));
        frame
    }

    /// Formats the command with or without a parameter.
    pub fn format_into(self, param: Option<u16>) -> CommandFrame {
        match param {
            Some(p) => self.encode_with(p),
            None => self.encode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command_frame() {
        assert_eq!(Command::GetDataReady.encode().as_slice(), &[0x02, 0x02]);
        assert_eq!(Command::ReadMeasurement.encode().as_slice(), &[0x03, 0x00]);
        assert_eq!(Command::ReadFirmwareVersion.encode().as_slice(), &[0xD1, 0x00]);
    }

    #[test]
    fn test_parameter_frame_carries_crc() {
        let frame = Command::MeasurementInterval.encode_with(0xBEEF);
        assert_eq!(frame.as_slice(), &[0x46, 0x00, 0xBE, 0xEF, 0x92]);
    }

    #[test]
    fn test_start_without_pressure() {
        let frame = Command::StartContinuousMeasurement.format_into(Some(0));
        assert_eq!(frame.len(), MAX_FRAME_LEN);
        assert_eq!(&frame[..4], &[0x00, 0x10, 0x00, 0x00]);
        assert_eq!(frame[4], 0x81);
    }

    #[test]
    fn test_format_into_without_param() {
        assert_eq!(Command::SoftReset.format_into(None).as_slice(), &[0xD3, 0x04]);
    }
}
