// src/common/error.rs

use core::fmt;

/// Coarse classification of every error the driver can report.
///
/// Callers use this to decide what to do with a failure: retry on the next
/// poll (`Busy`, `Communication`), log it (`Integrity`), or treat it as
/// state drift (`State`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorClass {
    /// Bus write/read failures, including length mismatches.
    Communication,
    /// CRC mismatch on a response group.
    Integrity,
    /// Not ready yet. A retry signal, not a real error.
    Busy,
    /// Operation invalid in the current lifecycle state.
    State,
    /// Caller-supplied value out of range.
    Parameter,
    /// Driver not started, or no bus bound.
    Lifecycle,
}

/// The closed error taxonomy, kept by the driver as its "last error".
///
/// `Success` is included so the last-error slot always holds a value.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum ErrorCode {
    Success = 0,
    NoBus,
    CommandWriteFailed,
    CommandWriteBufferFailed,
    InternalInvalidParameter,
    I2cReadShort,
    I2cReadRequest,
    I2cReadLong,
    Busy,
    NotMeasuring,
    Crc,
    Uninitialized,
    InvalidParameter,
    /// Kept so the code table stays complete; the driver's state handling is
    /// exhaustive and never produces it.
    InternalInvalidState,
    SensorUpdateFailed,
}

impl ErrorCode {
    /// Stable, human readable name of the code.
    pub const fn name(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::NoBus => "NoBus",
            ErrorCode::CommandWriteFailed => "CommandWriteFailed",
            ErrorCode::CommandWriteBufferFailed => "CommandWriteBufferFailed",
            ErrorCode::InternalInvalidParameter => "InternalInvalidParameter",
            ErrorCode::I2cReadShort => "I2cReadShort",
            ErrorCode::I2cReadRequest => "I2cReadRequest",
            ErrorCode::I2cReadLong => "I2cReadLong",
            ErrorCode::Busy => "Busy",
            ErrorCode::NotMeasuring => "NotMeasuring",
            ErrorCode::Crc => "Crc",
            ErrorCode::Uninitialized => "Uninitialized",
            ErrorCode::InvalidParameter => "InvalidParameter",
            ErrorCode::InternalInvalidState => "InternalInvalidState",
            ErrorCode::SensorUpdateFailed => "SensorUpdateFailed",
        }
    }

    /// Maps the code onto its error class. `Success` has no class.
    pub const fn class(self) -> Option<ErrorClass> {
        match self {
            ErrorCode::Success => None,
            ErrorCode::CommandWriteFailed
            | ErrorCode::CommandWriteBufferFailed
            | ErrorCode::I2cReadShort
            | ErrorCode::I2cReadRequest
            | ErrorCode::I2cReadLong
            | ErrorCode::SensorUpdateFailed => Some(ErrorClass::Communication),
            ErrorCode::Crc => Some(ErrorClass::Integrity),
            ErrorCode::Busy => Some(ErrorClass::Busy),
            ErrorCode::NotMeasuring | ErrorCode::InternalInvalidState => Some(ErrorClass::State),
            ErrorCode::InvalidParameter | ErrorCode::InternalInvalidParameter => {
                Some(ErrorClass::Parameter)
            }
            ErrorCode::Uninitialized | ErrorCode::NoBus => Some(ErrorClass::Lifecycle),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors returned by the SCD30 driver, generic over the bus error type.
#[derive(Debug, thiserror::Error)]
pub enum Scd30Error<E = ()>
where
    E: fmt::Debug,
{
    /// No bus is bound to the driver.
    #[error("no bus bound to the driver")]
    NoBus,

    /// The bus rejected the command write.
    #[error("command write failed: {0:?}")]
    CommandWrite(E),

    /// The bus accepted only part of the command frame.
    #[error("command write truncated: accepted {accepted} of {expected} bytes")]
    CommandWriteBuffer { expected: usize, accepted: usize },

    /// Response buffer length is not a positive multiple of 3, or is too long.
    #[error("invalid response length: {0}")]
    InternalInvalidParameter(usize),

    /// The read request itself failed on the bus.
    #[error("bus read request failed: {0:?}")]
    ReadRequest(E),

    /// Fewer bytes arrived than requested.
    #[error("short read: expected {expected}, got {got}")]
    ReadShort { expected: usize, got: usize },

    /// The bus reported more bytes than requested.
    #[error("long read: expected {expected}, got {got}")]
    ReadLong { expected: usize, got: usize },

    /// No reading available yet.
    #[error("measurement not ready")]
    Busy,

    /// The sensor is idle; no continuous measurement has been started.
    #[error("sensor is not measuring")]
    NotMeasuring,

    /// Received CRC does not match calculated CRC.
    #[error("CRC mismatch: expected {expected:#04x}, calculated {calculated:#04x}")]
    Crc { expected: u8, calculated: u8 },

    /// The driver has not been started.
    #[error("driver not started")]
    Uninitialized,

    /// A caller-supplied value is out of range.
    #[error("parameter out of range")]
    InvalidParameter,

    /// The driver reached a state combination that should not exist.
    ///
    /// Never constructed by [`crate::sensor::Scd30`], whose readiness check
    /// matches every state explicitly. It stays for taxonomy completeness.
    #[error("internal state violation")]
    InternalInvalidState,

    /// The device acknowledged a different value than the one written.
    #[error("sensor acknowledged {acknowledged}, requested {requested}")]
    SensorUpdateFailed { requested: u16, acknowledged: u16 },
}

impl<E: fmt::Debug> Scd30Error<E> {
    /// The taxonomy code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Scd30Error::NoBus => ErrorCode::NoBus,
            Scd30Error::CommandWrite(_) => ErrorCode::CommandWriteFailed,
            Scd30Error::CommandWriteBuffer { .. } => ErrorCode::CommandWriteBufferFailed,
            Scd30Error::InternalInvalidParameter(_) => ErrorCode::InternalInvalidParameter,
            Scd30Error::ReadRequest(_) => ErrorCode::I2cReadRequest,
            Scd30Error::ReadShort { .. } => ErrorCode::I2cReadShort,
            Scd30Error::ReadLong { .. } => ErrorCode::I2cReadLong,
            Scd30Error::Busy => ErrorCode::Busy,
            Scd30Error::NotMeasuring => ErrorCode::NotMeasuring,
            Scd30Error::Crc { .. } => ErrorCode::Crc,
            Scd30Error::Uninitialized => ErrorCode::Uninitialized,
            Scd30Error::InvalidParameter => ErrorCode::InvalidParameter,
            Scd30Error::InternalInvalidState => ErrorCode::InternalInvalidState,
            Scd30Error::SensorUpdateFailed { .. } => ErrorCode::SensorUpdateFailed,
        }
    }

    /// Shorthand for `self.code().class()`. Every error variant has a class.
    pub fn class(&self) -> ErrorClass {
        self.code().class().unwrap_or(ErrorClass::State)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_names_are_stable() {
        assert_eq!(ErrorCode::Success.name(), "Success");
        assert_eq!(ErrorCode::InternalInvalidParameter.name(), "InternalInvalidParameter");
        assert_eq!(ErrorCode::InvalidParameter.to_string(), "InvalidParameter");
        assert_eq!(ErrorCode::Crc as u8, 10);
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(Scd30Error::<()>::Busy.class(), ErrorClass::Busy);
        assert_eq!(Scd30Error::<()>::NotMeasuring.class(), ErrorClass::State);
        assert_eq!(Scd30Error::<()>::InternalInvalidState.class(), ErrorClass::State);
        assert_eq!(Scd30Error::CommandWrite(()).class(), ErrorClass::Communication);
        assert_eq!(Scd30Error::<()>::Crc { expected: 1, calculated: 2 }.class(), ErrorClass::Integrity);
        assert_eq!(Scd30Error::<()>::Uninitialized.class(), ErrorClass::Lifecycle);
        assert_eq!(Scd30Error::<()>::InvalidParameter.class(), ErrorClass::Parameter);
        assert_eq!(ErrorCode::Success.class(), None);
    }
}
