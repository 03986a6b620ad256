// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod address;
pub mod command;
pub mod crc;
pub mod error;
pub mod hal_traits;
pub mod timing;
pub mod types;

// --- Re-export key types/traits/functions for easier access ---

// From address.rs
pub use address::Scd30Addr;

// From command.rs
pub use command::{Command, CommandFrame};

// From crc.rs
pub use crc::{crc8, decode_response, verify_group, ResponseWords};

// From error.rs
pub use error::{ErrorClass, ErrorCode, Scd30Error};

// From hal_traits.rs
pub use hal_traits::{MillisClock, Scd30Bus, Scd30Timer};

// From types.rs
pub use types::{Measurement, ProductInfo, SensorState};

// --- Feature-gated re-exports ---

#[cfg(feature = "impl-embedded-hal")]
pub use hal_traits::{HalBus, HalTimer};
