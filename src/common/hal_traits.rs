// src/common/hal_traits.rs

use core::fmt::Debug;

/// Abstraction for the raw I2C-style transactions the driver needs.
///
/// The driver assumes bounded latency and exactly-once delivery when a call
/// returns `Ok`.
pub trait Scd30Bus {
    /// Associated error type for bus errors.
    type Error: Debug;

    /// Writes `bytes` to the device at `address` as one transaction.
    ///
    /// Returns the number of bytes the bus accepted; anything less than
    /// `bytes.len()` is reported as a truncated write.
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<usize, Self::Error>;

    /// Requests `buf.len()` bytes from the device at `address`.
    ///
    /// Returns how many bytes the device delivered. Implementations may report
    /// more than `buf.len()` when the peripheral had extra data queued; only
    /// `buf.len()` bytes are ever copied.
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// A monotonic millisecond clock that is allowed to wrap.
pub trait MillisClock {
    fn now_ms(&self) -> u32;
}

/// Clock plus short blocking delays, as needed between command and response.
pub trait Scd30Timer: MillisClock {
    /// Delay for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Adapts any `embedded_hal::i2c::I2c` implementation to [`Scd30Bus`].
#[cfg(feature = "impl-embedded-hal")]
#[derive(Debug)]
pub struct HalBus<I2C> {
    i2c: I2C,
}

#[cfg(feature = "impl-embedded-hal")]
impl<I2C> HalBus<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

#[cfg(feature = "impl-embedded-hal")]
impl<I2C> Scd30Bus for HalBus<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    type Error = I2C::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.i2c.write(address, bytes)?;
        Ok(bytes.len())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.i2c.read(address, buf)?;
        Ok(buf.len())
    }
}

/// Pairs an `embedded_hal::delay::DelayNs` with a [`MillisClock`] to form a [`Scd30Timer`].
#[cfg(feature = "impl-embedded-hal")]
#[derive(Debug)]
pub struct HalTimer<D, C> {
    delay: D,
    clock: C,
}

#[cfg(feature = "impl-embedded-hal")]
impl<D, C> HalTimer<D, C> {
    pub fn new(delay: D, clock: C) -> Self {
        Self { delay, clock }
    }
}

#[cfg(feature = "impl-embedded-hal")]
impl<D, C: MillisClock> MillisClock for HalTimer<D, C> {
    fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }
}

#[cfg(feature = "impl-embedded-hal")]
impl<D, C> Scd30Timer for HalTimer<D, C>
where
    D: embedded_hal::delay::DelayNs,
    C: MillisClock,
{
    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
