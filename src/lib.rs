// src/lib.rs

#![cfg_attr(not(test), no_std)] // no_std outside of unit tests

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod common;
pub mod sensor;
pub mod uplink;

// Re-export key types for convenience
pub use common::{ErrorClass, ErrorCode, Measurement, Scd30Addr, Scd30Error, SensorState};
pub use sensor::Scd30;
pub use uplink::{PayloadEncoder, UplinkConfig, UplinkOrchestrator, UplinkState};
