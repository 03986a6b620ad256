// src/sensor/driver.rs

use crate::common::{
    address::Scd30Addr,
    command::Command,
    error::{ErrorCode, Scd30Error},
    hal_traits::{Scd30Bus, Scd30Timer},
    timing::{self, deadline_reached, interval_ms, ms_until},
    types::{Measurement, ProductInfo, SensorState},
};
use nb::Result as NbResult;

/// Driver for one SCD30 on a shared I2C-style bus.
///
/// All operations are non-blocking except for the few milliseconds of delay
/// between a command and its response. Readiness is polled with
/// [`Scd30::query_ready`]; the driver never spins waiting for the sensor.
#[derive(Debug)]
pub struct Scd30<B, T>
where
    B: Scd30Bus,
    T: Scd30Timer,
{
    pub(super) bus: Option<B>,
    pub(super) timer: T,
    pub(super) address: Scd30Addr,
    pub(super) state: SensorState,
    /// Earliest time at which the sensor is worth polling again.
    pub(super) t_ready: u32,
    pub(super) info: ProductInfo,
    pub(super) measurement: Measurement,
    pub(super) last_error: ErrorCode,
}

impl<B, T> Scd30<B, T>
where
    B: Scd30Bus,
    T: Scd30Timer,
{
    pub fn new(bus: B, timer: T) -> Self {
        Self::with_address(bus, timer, Scd30Addr::default())
    }

    pub fn with_address(bus: B, timer: T, address: Scd30Addr) -> Self {
        let mut driver = Self::detached(timer);
        driver.bus = Some(bus);
        driver.address = address;
        driver
    }

    /// Creates a driver with no bus bound. Every bus operation fails with
    /// `NoBus` until [`Scd30::attach_bus`] is called.
    pub fn detached(timer: T) -> Self {
        Scd30 {
            bus: None,
            timer,
            address: Scd30Addr::default(),
            state: SensorState::Uninitialized,
            t_ready: 0,
            info: ProductInfo::default(),
            measurement: Measurement::default(),
            last_error: ErrorCode::Success,
        }
    }

    /// Binds a bus, returning the previously bound one.
    pub fn attach_bus(&mut self, bus: B) -> Option<B> {
        self.bus.replace(bus)
    }

    /// Stops the driver and hands the bus back.
    pub fn release_bus(&mut self) -> Option<B> {
        self.stop();
        self.bus.take()
    }

    // --- Lifecycle ---

    /// Starts the driver: reads the product info and schedules the first poll.
    ///
    /// A driver that was stopped with [`Scd30::stop`] resumes as `Triggered`;
    /// anything else starts as `Initial` with an extra warm-up grace. Starting a
    /// running driver is a no-op.
    ///
    /// On failure the next reading is reported one interval out, so a driver
    /// that is not running never looks due.
    pub fn start(&mut self) -> Result<(), Scd30Error<B::Error>> {
        let result = self.start_inner();
        if result.is_err() {
            self.schedule(interval_ms(self.info.measurement_interval));
        }
        self.record(result)
    }

    fn start_inner(&mut self) -> Result<(), Scd30Error<B::Error>> {
        if self.bus.is_none() {
            return Err(Scd30Error::NoBus);
        }
        if self.state.is_running() {
            return Ok(());
        }

        self.state = if self.state == SensorState::End {
            SensorState::Triggered
        } else {
            SensorState::Initial
        };

        if let Err(e) = self.read_product_info_inner() {
            log::warn!("scd30: start failed: {}", e.code());
            self.state = SensorState::Uninitialized;
            return Err(e);
        }

        let mut delay = interval_ms(self.info.measurement_interval);
        if self.state == SensorState::Initial {
            delay += timing::WARMUP_GRACE_MS;
        }
        self.schedule(delay);
        log::debug!(
            "scd30: started in {} (fw {}.{}, interval {}s)",
            self.state,
            self.info.firmware_major(),
            self.info.firmware_minor(),
            self.info.measurement_interval
        );
        Ok(())
    }

    /// Marks the driver stopped. No bus traffic; the device keeps measuring.
    pub fn stop(&mut self) {
        if self.state.is_running() {
            log::debug!("scd30: stopped");
            self.state = SensorState::End;
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    // --- Measurement ---

    /// Checks whether an unfetched reading is available.
    ///
    /// Returns `WouldBlock` while the sensor is busy. Before the scheduled
    /// ready time this touches neither the bus nor the state.
    pub fn query_ready(&mut self) -> NbResult<(), Scd30Error<B::Error>> {
        let result = self.poll_ready();
        self.record_nb(result)
    }

    /// Flag-style readiness check: `true` when ready, `false` otherwise with
    /// `error` set when the cause was not just "busy".
    pub fn query_ready_flag(&mut self, error: &mut bool) -> bool {
        match self.query_ready() {
            Ok(()) => {
                *error = false;
                true
            }
            Err(nb::Error::WouldBlock) => {
                *error = false;
                false
            }
            Err(nb::Error::Other(_)) => {
                *error = true;
                false
            }
        }
    }

    fn poll_ready(&mut self) -> NbResult<(), Scd30Error<B::Error>> {
        match self.state {
            SensorState::Uninitialized | SensorState::End => {
                return Err(nb::Error::Other(Scd30Error::Uninitialized))
            }
            SensorState::Ready => return Ok(()),
            SensorState::Idle => return Err(nb::Error::Other(Scd30Error::NotMeasuring)),
            SensorState::Initial | SensorState::Triggered => {}
        }

        if !deadline_reached(self.timer.now_ms(), self.t_ready) {
            return Err(nb::Error::WouldBlock);
        }

        let data_ready = match self.read_u16(Command::GetDataReady) {
            Ok(flag) => flag != 0,
            Err(e) => {
                self.schedule(timing::ERROR_RETRY_MS);
                return Err(nb::Error::Other(e));
            }
        };

        if data_ready {
            self.state = SensorState::Ready;
            return Ok(());
        }

        if self.state == SensorState::Initial {
            // Nothing after the warm-up grace: the device is not measuring yet.
            log::debug!("scd30: no data after warm-up, starting continuous measurement");
            if let Err(e) = self.start_measuring(0) {
                self.schedule(timing::ERROR_RETRY_MS);
                return Err(nb::Error::Other(e));
            }
        } else {
            self.schedule(timing::READY_POLL_RETRY_MS);
        }
        Err(nb::Error::WouldBlock)
    }

    /// Fetches the pending reading.
    ///
    /// Does nothing unless [`Scd30::query_ready`] would succeed. Once the read
    /// command is written the reading counts as consumed, even if the
    /// response turns out to be bad.
    pub fn read_measurement(&mut self) -> NbResult<Measurement, Scd30Error<B::Error>> {
        let result = self.read_measurement_inner();
        self.record_nb(result)
    }

    fn read_measurement_inner(&mut self) -> NbResult<Measurement, Scd30Error<B::Error>> {
        self.poll_ready()?;

        self.write_command(Command::ReadMeasurement, None)
            .map_err(nb::Error::Other)?;
        self.state = SensorState::Triggered;
        self.schedule(interval_ms(self.info.measurement_interval));

        self.timer.delay_ms(timing::READ_DELAY_MS);
        let mut buf = [0u8; 18];
        let words = self.read_response(&mut buf).map_err(nb::Error::Other)?;
        let words = <[u16; 6]>::try_from(words.as_slice())
            .map_err(|_| nb::Error::Other(Scd30Error::InternalInvalidParameter(words.len())))?;

        self.measurement = Measurement::from_words(&words);
        log::trace!(
            "scd30: co2 {} ppm, t {} C, rh {} %",
            self.measurement.co2_ppm,
            self.measurement.temperature,
            self.measurement.relative_humidity
        );
        Ok(self.measurement)
    }

    /// Milliseconds until the next reading is expected; 0 once it is due.
    pub fn ms_to_next_measurement(&self) -> u32 {
        ms_until(self.timer.now_ms(), self.t_ready)
    }

    // --- Accessors ---

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    pub fn last_error_name(&self) -> &'static str {
        self.last_error.name()
    }

    /// Most recent successful reading.
    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    pub fn product_info(&self) -> &ProductInfo {
        &self.info
    }

    pub fn measurement_interval(&self) -> u16 {
        self.info.measurement_interval
    }

    pub fn address(&self) -> Scd30Addr {
        self.address
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn bus(&self) -> Option<&B> {
        self.bus.as_ref()
    }

    /// Direct bus access, bypassing the driver's state.
    pub fn bus_mut(&mut self) -> Option<&mut B> {
        self.bus.as_mut()
    }

    pub(super) fn schedule(&mut self, delay_ms: u32) {
        self.t_ready = self.timer.now_ms().wrapping_add(delay_ms);
    }
}
