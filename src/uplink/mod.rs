// src/uplink/mod.rs

// Measure, encode, send, sleep. Pure pieces first, the orchestrator last.
pub mod config;       // UplinkConfig and the wake policy
pub mod flags;        // Payload field flags and operating flags
pub mod fsm;          // Transition table as pure functions
pub mod orchestrator; // Drives the cycle against the platform
pub mod payload;      // Wire format encoder and companion decoder
pub mod platform;     // Capability traits the board provides
pub mod signal;       // Transmit-done handoff between contexts
pub mod sleep;        // Sleep-depth policy

// --- Public Re-exports ---
pub use config::{UplinkConfig, WakePolicy};
pub use flags::{OperatingFlags, UplinkFlags};
pub use fsm::UplinkState;
pub use orchestrator::UplinkOrchestrator;
pub use payload::{decode_payload, DecodedUplink, PayloadEncoder, PayloadError, PayloadInputs, TxBuffer};
pub use platform::{
    MeasurementSource, Platform, PowerManager, SendRequest, StatusIndicator, Telemetry,
    UplinkStatus, UplinkTransport,
};
pub use signal::{TxDoneSignal, TxOutcome};
pub use sleep::{choose_sleep_depth, SleepDepth, SleepEnvironment};
