// src/sensor/settings.rs

use super::driver::Scd30;
use crate::common::{
    command::Command,
    error::Scd30Error,
    hal_traits::{Scd30Bus, Scd30Timer},
    timing::{self, interval_ms, MEASUREMENT_INTERVAL_MAX_S, MEASUREMENT_INTERVAL_MIN_S},
    types::{ProductInfo, SensorState},
};

/// Accepted forced recalibration reference, ppm.
pub const FRC_RANGE_PPM: core::ops::RangeInclusive<u16> = 400..=2000;
/// Accepted ambient pressure for compensation, mbar.
pub const PRESSURE_RANGE_MBAR: core::ops::RangeInclusive<u16> = 700..=1400;

// Device settings. Setters are confirmed: the value is written, read back, and
// the acknowledged value is what ends up in the product info.
impl<B, T> Scd30<B, T>
where
    B: Scd30Bus,
    T: Scd30Timer,
{
    /// Re-reads firmware version and all settings from the device.
    pub fn read_product_info(&mut self) -> Result<(), Scd30Error<B::Error>> {
        let result = self
            .check_running()
            .and_then(|()| self.read_product_info_inner());
        self.record(result)
    }

    /// Fails fast on the first failed read. The cached info is replaced only
    /// once every field has been read.
    pub(super) fn read_product_info_inner(&mut self) -> Result<(), Scd30Error<B::Error>> {
        let firmware_version = self.read_u16(Command::ReadFirmwareVersion)?;

        let interval = self.read_u16(Command::MeasurementInterval)?;
        let measurement_interval =
            interval.clamp(MEASUREMENT_INTERVAL_MIN_S, MEASUREMENT_INTERVAL_MAX_S);
        if measurement_interval != interval {
            log::warn!(
                "scd30: device reports interval {}s, using {}s",
                interval,
                measurement_interval
            );
        }

        self.info = ProductInfo {
            firmware_version,
            measurement_interval,
            auto_self_calibration: self.read_u16(Command::AutoSelfCalibration)? != 0,
            forced_recalibration_value: self.read_u16(Command::ForcedRecalibration)?,
            temperature_offset: self.read_u16(Command::TemperatureOffset)? as i16,
            altitude_compensation: self.read_u16(Command::AltitudeCompensation)? as i16,
        };
        Ok(())
    }

    /// Writes `value` and reads it back. Mismatch is `SensorUpdateFailed`.
    fn write_confirmed(&mut self, command: Command, value: u16) -> Result<u16, Scd30Error<B::Error>> {
        self.check_running()?;
        self.write_command(command, Some(value))?;
        self.timer.delay_ms(timing::COMMAND_RECOVERY_MS);

        let acknowledged = self.read_u16(command)?;
        if acknowledged != value {
            log::warn!(
                "scd30: {:?} wrote {}, device kept {}",
                command,
                value,
                acknowledged
            );
            return Err(Scd30Error::SensorUpdateFailed {
                requested: value,
                acknowledged,
            });
        }
        Ok(acknowledged)
    }

    /// Sets the measurement interval, 2..=1800 seconds.
    pub fn set_measurement_interval(&mut self, seconds: u16) -> Result<(), Scd30Error<B::Error>> {
        let result = self.set_measurement_interval_inner(seconds);
        self.record(result)
    }

    fn set_measurement_interval_inner(&mut self, seconds: u16) -> Result<(), Scd30Error<B::Error>> {
        if !(MEASUREMENT_INTERVAL_MIN_S..=MEASUREMENT_INTERVAL_MAX_S).contains(&seconds) {
            return Err(Scd30Error::InvalidParameter);
        }
        let ack = self.write_confirmed(Command::MeasurementInterval, seconds)?;
        self.info.measurement_interval = ack;
        Ok(())
    }

    pub fn set_auto_self_calibration(&mut self, enabled: bool) -> Result<(), Scd30Error<B::Error>> {
        let result = self
            .write_confirmed(Command::AutoSelfCalibration, enabled as u16)
            .map(|ack| self.info.auto_self_calibration = ack != 0);
        self.record(result)
    }

    /// Forces recalibration against a known CO2 concentration, 400..=2000 ppm.
    pub fn set_forced_recalibration_value(&mut self, ppm: u16) -> Result<(), Scd30Error<B::Error>> {
        let result = if FRC_RANGE_PPM.contains(&ppm) {
            self.write_confirmed(Command::ForcedRecalibration, ppm)
                .map(|ack| self.info.forced_recalibration_value = ack)
        } else {
            Err(Scd30Error::InvalidParameter)
        };
        self.record(result)
    }

    /// Temperature offset in 0.01 °C. Negative offsets are rejected.
    pub fn set_temperature_offset(&mut self, offset: i16) -> Result<(), Scd30Error<B::Error>> {
        let result = if offset >= 0 {
            self.write_confirmed(Command::TemperatureOffset, offset as u16)
                .map(|ack| self.info.temperature_offset = ack as i16)
        } else {
            Err(Scd30Error::InvalidParameter)
        };
        self.record(result)
    }

    /// Altitude above sea level in meters. Negative altitudes are rejected.
    pub fn set_altitude_compensation(&mut self, meters: i16) -> Result<(), Scd30Error<B::Error>> {
        let result = if meters >= 0 {
            self.write_confirmed(Command::AltitudeCompensation, meters as u16)
                .map(|ack| self.info.altitude_compensation = ack as i16)
        } else {
            Err(Scd30Error::InvalidParameter)
        };
        self.record(result)
    }

    // --- Measurement mode ---

    /// Starts continuous measurement without pressure compensation.
    pub fn start_continuous_measurement(&mut self) -> Result<(), Scd30Error<B::Error>> {
        let result = self.start_measuring(0);
        self.record(result)
    }

    /// Starts continuous measurement compensated for ambient pressure, 700..=1400 mbar.
    pub fn start_continuous_measurement_with_pressure(
        &mut self,
        mbar: u16,
    ) -> Result<(), Scd30Error<B::Error>> {
        let result = if PRESSURE_RANGE_MBAR.contains(&mbar) {
            self.start_measuring(mbar)
        } else {
            Err(Scd30Error::InvalidParameter)
        };
        self.record(result)
    }

    /// `mbar == 0` disables pressure compensation.
    pub(super) fn start_measuring(&mut self, mbar: u16) -> Result<(), Scd30Error<B::Error>> {
        self.check_running()?;
        self.write_command(Command::StartContinuousMeasurement, Some(mbar))?;
        self.state = SensorState::Triggered;
        self.schedule(interval_ms(self.info.measurement_interval));
        Ok(())
    }

    /// Stops continuous measurement; the driver stays running in `Idle`.
    pub fn stop_measurement(&mut self) -> Result<(), Scd30Error<B::Error>> {
        let result = self
            .check_running()
            .and_then(|()| self.write_command(Command::StopContinuousMeasurement, None))
            .map(|()| {
                log::debug!("scd30: measurement stopped");
                self.state = SensorState::Idle;
            });
        self.record(result)
    }

    /// Resets the device. It comes back in its power-on mode, so the driver
    /// treats it like a fresh start.
    pub fn soft_reset(&mut self) -> Result<(), Scd30Error<B::Error>> {
        let result = self
            .check_running()
            .and_then(|()| self.write_command(Command::SoftReset, None))
            .map(|()| {
                self.state = SensorState::Initial;
                self.schedule(interval_ms(self.info.measurement_interval) + timing::WARMUP_GRACE_MS);
            });
        self.record(result)
    }
}
