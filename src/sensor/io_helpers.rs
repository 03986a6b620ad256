// src/sensor/io_helpers.rs

use super::driver::Scd30;
use crate::common::{
    command::Command,
    crc::{check_response_len, decode_response, ResponseWords},
    error::{ErrorCode, Scd30Error},
    hal_traits::{Scd30Bus, Scd30Timer},
    timing,
};
use nb::Result as NbResult;

// Bus framing and error bookkeeping shared by every driver operation.
impl<B, T> Scd30<B, T>
where
    B: Scd30Bus,
    T: Scd30Timer,
{
    /// Stores the outcome of a public operation as the last error.
    pub(super) fn record<R>(
        &mut self,
        result: Result<R, Scd30Error<B::Error>>,
    ) -> Result<R, Scd30Error<B::Error>> {
        self.last_error = match &result {
            Ok(_) => ErrorCode::Success,
            Err(e) => e.code(),
        };
        result
    }

    /// Like [`Scd30::record`]; `WouldBlock` records as `Busy`.
    pub(super) fn record_nb<R>(
        &mut self,
        result: NbResult<R, Scd30Error<B::Error>>,
    ) -> NbResult<R, Scd30Error<B::Error>> {
        self.last_error = match &result {
            Ok(_) => ErrorCode::Success,
            Err(nb::Error::WouldBlock) => ErrorCode::Busy,
            Err(nb::Error::Other(e)) => e.code(),
        };
        result
    }

    pub(super) fn check_running(&self) -> Result<(), Scd30Error<B::Error>> {
        if self.state.is_running() {
            Ok(())
        } else {
            Err(Scd30Error::Uninitialized)
        }
    }

    /// Writes a command, with its CRC-protected argument if any, as one transaction.
    pub(super) fn write_command(
        &mut self,
        command: Command,
        param: Option<u16>,
    ) -> Result<(), Scd30Error<B::Error>> {
        let frame = command.format_into(param);
        let address = self.address.as_u8();
        let bus = self.bus.as_mut().ok_or(Scd30Error::NoBus)?;

        log::trace!("scd30: tx {:02x?}", frame.as_slice());
        let accepted = bus.write(address, &frame).map_err(Scd30Error::CommandWrite)?;
        if accepted != frame.len() {
            return Err(Scd30Error::CommandWriteBuffer {
                expected: frame.len(),
                accepted,
            });
        }
        Ok(())
    }

    /// Reads exactly `buf.len()` bytes and checks every word's CRC.
    pub(super) fn read_response(
        &mut self,
        buf: &mut [u8],
    ) -> Result<ResponseWords, Scd30Error<B::Error>> {
        check_response_len(buf.len())?;
        let address = self.address.as_u8();
        let bus = self.bus.as_mut().ok_or(Scd30Error::NoBus)?;

        let expected = buf.len();
        let got = bus.read(address, buf).map_err(Scd30Error::ReadRequest)?;
        if got > expected {
            return Err(Scd30Error::ReadLong { expected, got });
        }
        if got < expected {
            return Err(Scd30Error::ReadShort { expected, got });
        }
        log::trace!("scd30: rx {:02x?}", &buf[..]);
        decode_response(buf)
    }

    /// Command without argument followed by a one-word response.
    pub(super) fn read_u16(&mut self, command: Command) -> Result<u16, Scd30Error<B::Error>> {
        self.write_command(command, None)?;
        self.timer.delay_ms(timing::READ_DELAY_MS);

        let mut buf = [0u8; 3];
        let words = self.read_response(&mut buf)?;
        words
            .first()
            .copied()
            .ok_or(Scd30Error::InternalInvalidParameter(buf.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::hal_traits::MillisClock;
    use crate::common::types::SensorState;
    use crate::sensor::mock::{FakeScd30, MockTimer};

    fn running() -> Scd30<FakeScd30, MockTimer> {
        let mut d = Scd30::new(FakeScd30::default(), MockTimer::new(0));
        d.state = SensorState::Triggered;
        d
    }

    #[test]
    fn test_write_command_frames() {
        let mut d = running();
        d.write_command(Command::MeasurementInterval, Some(10)).unwrap();
        d.write_command(Command::GetDataReady, None).unwrap();
        let writes = &d.bus.as_ref().unwrap().writes;
        assert_eq!(writes[0], [0x46, 0x00, 0x00, 0x0A, 0x5A]);
        assert_eq!(writes[1], [0x02, 0x02]);
    }

    #[test]
    fn test_read_u16_waits_before_reading() {
        let mut d = running();
        d.bus.as_mut().unwrap().interval = 30;
        assert_eq!(d.read_u16(Command::MeasurementInterval).unwrap(), 30);
        assert_eq!(d.timer.now_ms(), timing::READ_DELAY_MS);
    }

    #[test]
    fn test_read_length_mismatch() {
        let mut d = running();
        // data-ready queues one word, ask for two
        d.write_command(Command::GetDataReady, None).unwrap();
        let mut buf = [0u8; 6];
        assert!(matches!(
            d.read_response(&mut buf),
            Err(Scd30Error::ReadShort { expected: 6, got: 3 })
        ));

        // measurement queues six words, ask for one
        d.write_command(Command::ReadMeasurement, None).unwrap();
        let mut buf = [0u8; 3];
        assert!(matches!(
            d.read_response(&mut buf),
            Err(Scd30Error::ReadLong { expected: 3, got: 18 })
        ));
    }

    #[test]
    fn test_invalid_buffer_length_rejected_before_bus() {
        let mut d = running();
        let mut buf = [0u8; 4];
        assert!(matches!(
            d.read_response(&mut buf),
            Err(Scd30Error::InternalInvalidParameter(4))
        ));
        let mut empty = [0u8; 0];
        assert!(d.read_response(&mut empty).is_err());
    }

    #[test]
    fn test_record_tracks_last_error() {
        let mut d = running();
        let _ = d.record::<()>(Err(Scd30Error::InvalidParameter));
        assert_eq!(d.last_error(), ErrorCode::InvalidParameter);
        let _ = d.record_nb::<()>(Err(nb::Error::WouldBlock));
        assert_eq!(d.last_error(), ErrorCode::Busy);
        let _ = d.record(Ok(()));
        assert_eq!(d.last_error(), ErrorCode::Success);
    }
}
