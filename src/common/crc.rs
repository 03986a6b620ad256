// src/common/crc.rs

use super::error::Scd30Error;
use core::fmt::Debug;
use crc::Algorithm;

/// Parameters of the SCD30 CRC-8, in `crc` crate catalogue form.
/// Polynomial: 0x31 (x^8 + x^5 + x^4 + 1)
/// Initial Value: 0xFF
/// Input/Output Reflected: false
/// Final XOR: 0x00
/// Check Value: 0xF7 (for "123456789"), same as CRC-8/NRSC-5
pub const SCD30_CRC: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0xFF,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xF7,
    residue: 0x00,
};

/// Initial CRC register value.
pub const CRC8_INIT: u8 = 0xFF;

/// Bytes per response group: two data bytes followed by their CRC.
pub const GROUP_LEN: usize = 3;

/// Longest response the device ever sends (ten groups).
pub const MAX_RESPONSE_LEN: usize = 30;

/// Maximum number of 16-bit words in one response.
pub const MAX_RESPONSE_WORDS: usize = MAX_RESPONSE_LEN / GROUP_LEN;

/// Decoded response words, in the order they arrived.
pub type ResponseWords = heapless::Vec<u16, MAX_RESPONSE_WORDS>;

// Multiples of 0x31 for every 4-bit value; the register is advanced one nibble at a time.
const CRC_NIBBLE_TABLE: [u8; 16] = [
    0x00, 0x31, 0x62, 0x53, 0xc4, 0xf5, 0xa6, 0x97,
    0xb9, 0x88, 0xdb, 0xea, 0x7d, 0x4c, 0x1f, 0x2e,
];

/// Calculates the SCD30 CRC-8 of `data`, starting from [`CRC8_INIT`].
///
/// The device rejects frames whose CRC does not match bit-for-bit, so this is
/// the exact nibble-table algorithm the device uses: each byte is folded into
/// the register in two 4-bit steps against a 16-entry table.
#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    crc8_with_seed(data, CRC8_INIT)
}

/// Continues a CRC-8 calculation from an arbitrary register value.
pub fn crc8_with_seed(data: &[u8], seed: u8) -> u8 {
    let mut crc = seed;

    for &byte in data {
        // high nibble
        let index = (byte ^ crc) >> 4;
        crc = (crc << 4) ^ CRC_NIBBLE_TABLE[index as usize];

        // low nibble: top nibble of (crc ^ (byte << 4))
        let index = ((crc >> 4) ^ byte) & 0x0F;
        crc = (crc << 4) ^ CRC_NIBBLE_TABLE[index as usize];
    }

    crc
}

/// Verifies a single 3-byte group (2 data bytes + CRC) and returns its big-endian value.
///
/// # Returns
///
/// * `Ok(value)` if the CRC matches.
/// * `Err(Scd30Error::Crc)` if the stored CRC disagrees with the recomputed one.
pub fn verify_group<E>(group: &[u8; GROUP_LEN]) -> Result<u16, Scd30Error<E>>
where
    E: Debug,
{
    let calculated = crc8(&group[..2]);
    if calculated != group[2] {
        return Err(Scd30Error::Crc {
            expected: group[2],
            calculated,
        });
    }
    Ok(u16::from_be_bytes([group[0], group[1]]))
}

/// Decodes a raw response buffer made of 3-byte groups.
///
/// # Returns
///
/// * `Ok(words)` with one big-endian value per group.
/// * `Err(Scd30Error::InternalInvalidParameter)` if the length is zero, not a multiple
///   of 3, or longer than [`MAX_RESPONSE_LEN`].
/// * `Err(Scd30Error::Crc)` at the first group whose CRC does not match.
pub fn decode_response<E>(buffer: &[u8]) -> Result<ResponseWords, Scd30Error<E>>
where
    E: Debug,
{
    check_response_len(buffer.len())?;

    let mut words = ResponseWords::new();
    for chunk in buffer.chunks_exact(GROUP_LEN) {
        let group: &[u8; GROUP_LEN] = chunk
            .try_into()
            .map_err(|_| Scd30Error::InternalInvalidParameter(buffer.len()))?;
        let value = verify_group(group)?;
        words
            .push(value)
            .map_err(|_| Scd30Error::InternalInvalidParameter(buffer.len()))?;
    }
    Ok(words)
}

/// Checks that `len` is a valid response length for the device.
pub fn check_response_len<E>(len: usize) -> Result<(), Scd30Error<E>>
where
    E: Debug,
{
    if len == 0 || len > MAX_RESPONSE_LEN || len % GROUP_LEN != 0 {
        Err(Scd30Error::InternalInvalidParameter(len))
    } else {
        Ok(())
    }
}

/// Appends `value` as a big-endian word plus CRC, the layout the device uses
/// for parameters and responses.
pub fn encode_group(value: u16) -> [u8; GROUP_LEN] {
    let [hi, lo] = value.to_be_bytes();
    [hi, lo, crc8(&[hi, lo])]
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crc::Crc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct MockIoError;

    const REFERENCE: Crc<u8> = Crc::<u8>::new(&SCD30_CRC);

    #[test]
    fn test_datasheet_vector() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn test_crc_is_deterministic() {
        let data = [0x43, 0xDB, 0x8B, 0xDF];
        let first = crc8(&data);
        for _ in 0..10 {
            assert_eq!(crc8(&data), first);
        }
    }

    #[test]
    fn test_matches_catalogue_algorithm() {
        assert_eq!(crc8(b"123456789"), SCD30_CRC.check);
        for hi in (0u16..=255).step_by(7) {
            for lo in (0u16..=255).step_by(11) {
                let pair = [hi as u8, lo as u8];
                assert_eq!(crc8(&pair), REFERENCE.checksum(&pair), "mismatch for {:02x?}", pair);
            }
        }
    }

    #[test]
    fn test_seed_continuation() {
        let whole = crc8(&[0x01, 0x02, 0x03]);
        let split = crc8_with_seed(&[0x03], crc8(&[0x01, 0x02]));
        assert_eq!(whole, split);
    }

    #[test]
    fn test_decode_single_group() {
        let words = decode_response::<MockIoError>(&[0xBE, 0xEF, 0x92]).unwrap();
        assert_eq!(words.as_slice(), &[0xBEEF]);
    }

    #[test]
    fn test_decode_multiple_groups() {
        let mut buffer = [0u8; 9];
        buffer[..3].copy_from_slice(&encode_group(0x0002));
        buffer[3..6].copy_from_slice(&encode_group(0x4600));
        buffer[6..].copy_from_slice(&encode_group(0xFFFF));
        let words = decode_response::<MockIoError>(&buffer).unwrap();
        assert_eq!(words.as_slice(), &[0x0002, 0x4600, 0xFFFF]);
    }

    #[test]
    fn test_decode_rejects_bad_lengths() {
        for len in [0usize, 1, 2, 4, 5, 7, 29, 31, 33] {
            let buffer = [0u8; 40];
            assert!(
                matches!(
                    decode_response::<MockIoError>(&buffer[..len]),
                    Err(Scd30Error::InternalInvalidParameter(l)) if l == len
                ),
                "length {} should be rejected",
                len
            );
        }
    }

    #[test]
    fn test_decode_stops_at_first_crc_mismatch() {
        let mut buffer = [0u8; 9];
        buffer[..3].copy_from_slice(&encode_group(0x1234));
        buffer[3..6].copy_from_slice(&[0xBE, 0xEF, 0x93]);
        // third group also broken; the error must describe the second one
        buffer[6..].copy_from_slice(&[0x00, 0x00, 0x00]);
        let result = decode_response::<MockIoError>(&buffer);
        assert!(matches!(
            result,
            Err(Scd30Error::Crc { expected: 0x93, calculated: 0x92 })
        ));
    }

    #[test]
    fn test_encode_group_layout() {
        assert_eq!(encode_group(0xBEEF), [0xBE, 0xEF, 0x92]);
        assert_eq!(verify_group::<MockIoError>(&encode_group(1800)).unwrap(), 1800);
    }
}
