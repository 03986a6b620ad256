// src/sensor/mod.rs

// The SCD30 driver, split the same way as its concerns:
mod driver;       // Struct, lifecycle, readiness polling and measurement fetch
mod io_helpers;   // Command framing, response reads, last-error bookkeeping
pub mod settings; // Product info and confirmed device settings

#[cfg(test)]
pub(crate) mod mock;

// --- Public Re-exports ---
pub use driver::Scd30;
pub use settings::{FRC_RANGE_PPM, PRESSURE_RANGE_MBAR};
