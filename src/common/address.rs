// src/common/address.rs

use super::error::Scd30Error;
use core::convert::TryFrom;
use core::fmt;

/// A 7-bit I2C device address.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Scd30Addr(u8);

impl Scd30Addr {
    /// The factory address of the SCD30.
    pub const DEFAULT_ADDRESS: Scd30Addr = Scd30Addr(0x61);

    /// Creates a new `Scd30Addr` if the value fits in 7 bits.
    /// Returns `Result<Self, Scd30Error<()>>` because validation itself
    /// cannot cause a bus error.
    pub fn new(address: u8) -> Result<Self, Scd30Error<()>> {
        if Self::is_valid(address) {
            Ok(Scd30Addr(address))
        } else {
            Err(Scd30Error::InvalidParameter)
        }
    }

    #[inline]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_valid(address: u8) -> bool {
        address <= 0x7F
    }
}

impl Default for Scd30Addr {
    fn default() -> Self {
        Self::DEFAULT_ADDRESS
    }
}

impl TryFrom<u8> for Scd30Addr {
    type Error = Scd30Error<()>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Scd30Addr> for u8 {
    fn from(addr: Scd30Addr) -> Self {
        addr.0
    }
}

impl fmt::Display for Scd30Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_address() {
        assert_eq!(Scd30Addr::default().as_u8(), 0x61);
        assert_eq!(u8::from(Scd30Addr::DEFAULT_ADDRESS), 0x61);
    }

    #[test]
    fn test_rejects_eight_bit_addresses() {
        assert!(Scd30Addr::new(0x7F).is_ok());
        assert!(matches!(Scd30Addr::new(0x80), Err(Scd30Error::InvalidParameter)));
        assert!(Scd30Addr::try_from(0xC2).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Scd30Addr::DEFAULT_ADDRESS.to_string(), "0x61");
    }
}
