// src/uplink/platform.rs

// Capabilities the orchestrator needs from the board. Everything is passed in
// explicitly; the orchestrator owns no globals.

use core::fmt::Debug;

use super::signal::TxDoneSignal;
use crate::common::{
    error::{ErrorClass, Scd30Error},
    hal_traits::{MillisClock, Scd30Bus, Scd30Timer},
    timing::interval_ms,
    types::Measurement,
};
use crate::sensor::Scd30;

/// A sensor the orchestrator can measure with.
pub trait MeasurementSource {
    type Error: Debug;

    fn start(&mut self) -> Result<(), Self::Error>;

    fn stop(&mut self);

    /// Fetches a reading if one is ready; `WouldBlock` while busy.
    fn read_measurement(&mut self) -> nb::Result<Measurement, Self::Error>;

    /// Milliseconds until the next reading is due, 0 once due.
    fn ms_to_next_measurement(&self) -> u32;

    /// The sensor's measurement period, ms. Also the shortest spacing between
    /// two uplinks that follow the sensor.
    fn interval_ms(&self) -> u32;

    fn classify(error: &Self::Error) -> ErrorClass;

    /// Sensor-specific power down between measuring and sending.
    fn quiesce(&mut self) {}
}

impl<B, T> MeasurementSource for Scd30<B, T>
where
    B: Scd30Bus,
    T: Scd30Timer,
{
    type Error = Scd30Error<B::Error>;

    fn start(&mut self) -> Result<(), Self::Error> {
        Scd30::start(self)
    }

    fn stop(&mut self) {
        Scd30::stop(self)
    }

    fn read_measurement(&mut self) -> nb::Result<Measurement, Self::Error> {
        Scd30::read_measurement(self)
    }

    fn ms_to_next_measurement(&self) -> u32 {
        Scd30::ms_to_next_measurement(self)
    }

    fn interval_ms(&self) -> u32 {
        interval_ms(self.measurement_interval())
    }

    fn classify(error: &Self::Error) -> ErrorClass {
        error.class()
    }
}

/// How one uplink should be sent.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SendRequest {
    pub confirmed: bool,
    pub port: u8,
}

pub trait UplinkTransport {
    /// Queues `payload` for transmission.
    ///
    /// Returns `false` if it could not even be queued. Otherwise the transport
    /// calls [`TxDoneSignal::complete`] on `done` exactly once, from any context.
    fn send(&mut self, payload: &[u8], request: SendRequest, done: &TxDoneSignal) -> bool;
}

pub trait PowerManager {
    /// Suspends the whole system for `secs` seconds. Blocks until resumed.
    fn deep_sleep(&mut self, secs: u32);

    /// Power down peripherals ahead of deep sleep.
    fn prepare_deep_sleep(&mut self) {}

    /// Bring peripherals back after deep sleep.
    fn recover_from_deep_sleep(&mut self) {}

    /// Idle for at most `max_ms`; returning early is fine.
    fn light_sleep(&mut self, _max_ms: u32) {}

    /// Hardware quiesce while inactive.
    fn quiesce(&mut self) {}

    /// A debug console is attached and must stay reachable.
    fn console_attached(&self) -> bool {
        false
    }
}

pub trait Telemetry {
    fn battery_volts(&mut self) -> f32;

    fn boot_count(&self) -> Option<u32> {
        None
    }
}

/// Coarse progress shown to a human, e.g. on an LED.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UplinkStatus {
    Idle,
    WarmingUp,
    Measuring,
    Settling,
    Sending,
    Sleeping,
    Off,
}

pub trait StatusIndicator {
    fn indicate(&mut self, status: UplinkStatus);
}

/// Everything the orchestrator needs from the board, in one bound.
pub trait Platform: UplinkTransport + PowerManager + Telemetry + StatusIndicator + MillisClock {}

impl<P> Platform for P where P: UplinkTransport + PowerManager + Telemetry + StatusIndicator + MillisClock {}
