// src/uplink/payload.rs

//! Uplink wire format.
//!
//! ```text
//! byte 0        format id
//! byte 1        UplinkFlags
//! [battery]     i16 BE, volts * 4096
//! [boot]        u8, low byte of the boot counter
//! [temp+rh]     i16 BE, °C * 200; u16 BE, %RH * 65535 / 100
//! [co2]         u16 BE, ppm / 40000 * 65535
//! ```
//!
//! Every scaled field goes through [`FIELDS`], shared by the encoder and
//! [`decode_payload`].

use arrayvec::ArrayVec;

use super::flags::UplinkFlags;
use crate::common::types::Measurement;

/// Enough for the largest payload (11 bytes) with room to grow.
pub const TX_BUFFER_CAPACITY: usize = 16;
pub type TxBuffer = ArrayVec<u8, TX_BUFFER_CAPACITY>;

pub const DEFAULT_FORMAT_ID: u8 = 0x1F;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Field {
    Battery,
    Boot,
    Temperature,
    Humidity,
    Co2,
}

/// How one field maps a real value onto the wire.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FieldSpec {
    pub field: Field,
    /// Wire value = round(value * scale).
    pub scale: f32,
    /// Width in bytes, big-endian.
    pub width: usize,
    pub signed: bool,
}

/// Indexed by `Field as usize`.
pub static FIELDS: [FieldSpec; 5] = [
    FieldSpec { field: Field::Battery, scale: 4096.0, width: 2, signed: true },
    FieldSpec { field: Field::Boot, scale: 1.0, width: 1, signed: false },
    FieldSpec { field: Field::Temperature, scale: 200.0, width: 2, signed: true },
    FieldSpec { field: Field::Humidity, scale: 65535.0 / 100.0, width: 2, signed: false },
    FieldSpec { field: Field::Co2, scale: 65535.0 / 40000.0, width: 2, signed: false },
];

pub fn layout(field: Field) -> &'static FieldSpec {
    &FIELDS[field as usize]
}

impl FieldSpec {
    fn range(&self) -> (i32, i32) {
        let bits = 8 * self.width as u32;
        if self.signed {
            (-(1 << (bits - 1)), (1 << (bits - 1)) - 1)
        } else {
            (0, (1 << bits) - 1)
        }
    }

    /// Rounds half away from zero and saturates to the field width. NaN encodes as 0.
    pub fn to_raw(&self, value: f32) -> i32 {
        let scaled = libm::roundf(value * self.scale);
        if scaled.is_nan() {
            return 0;
        }
        let (min, max) = self.range();
        if scaled <= min as f32 {
            min
        } else if scaled >= max as f32 {
            max
        } else {
            scaled as i32
        }
    }

    pub fn from_raw(&self, raw: i32) -> f32 {
        raw as f32 / self.scale
    }

    fn put(&self, raw: i32, buf: &mut TxBuffer) {
        let bytes = raw.to_be_bytes();
        buf.extend(bytes[4 - self.width..].iter().copied());
    }

    fn take(&self, bytes: &[u8]) -> i32 {
        let mut raw: u32 = 0;
        for b in &bytes[..self.width] {
            raw = (raw << 8) | u32::from(*b);
        }
        if self.signed {
            let shift = 32 - 8 * self.width as u32;
            ((raw << shift) as i32) >> shift
        } else {
            raw as i32
        }
    }
}

/// What goes into one uplink.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PayloadInputs {
    pub battery_volts: f32,
    pub boot_count: Option<u32>,
    /// `Some` only when the last fetch succeeded.
    pub measurement: Option<Measurement>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PayloadEncoder {
    format_id: u8,
}

impl Default for PayloadEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_FORMAT_ID)
    }
}

impl PayloadEncoder {
    pub const fn new(format_id: u8) -> Self {
        Self { format_id }
    }

    pub const fn format_id(&self) -> u8 {
        self.format_id
    }

    pub fn encode(&self, inputs: &PayloadInputs) -> TxBuffer {
        let mut buf = TxBuffer::new();
        let mut flags = UplinkFlags::empty();

        buf.push(self.format_id);
        buf.push(0); // flags, patched below

        let battery = layout(Field::Battery);
        battery.put(battery.to_raw(inputs.battery_volts), &mut buf);
        flags.insert(UplinkFlags::BATTERY);

        if let Some(boot) = inputs.boot_count {
            layout(Field::Boot).put((boot & 0xFF) as i32, &mut buf);
            flags.insert(UplinkFlags::BOOT);
        }

        if let Some(m) = inputs.measurement {
            let t = layout(Field::Temperature);
            let rh = layout(Field::Humidity);
            t.put(t.to_raw(m.temperature), &mut buf);
            rh.put(rh.to_raw(m.relative_humidity), &mut buf);
            flags.insert(UplinkFlags::TEMP_HUMIDITY);

            // First reading after power-up is exactly 0.0; that is not a real zero.
            if m.co2_ppm != 0.0 {
                let co2 = layout(Field::Co2);
                co2.put(co2.to_raw(m.co2_ppm), &mut buf);
                flags.insert(UplinkFlags::CO2);
            }
        }

        buf[1] = flags.bits();
        log::debug!("uplink: built {} bytes, flags {}", buf.len(), flags);
        buf
    }

    #[cfg(feature = "alloc")]
    pub fn encode_to_vec(&self, inputs: &PayloadInputs) -> alloc::vec::Vec<u8> {
        self.encode(inputs).as_slice().to_vec()
    }
}

// --- Decoding ---

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload truncated: need {needed} bytes, have {got}")]
    Truncated { needed: usize, got: usize },
    #[error("unknown flag bits {0:#04x}")]
    UnknownFlags(u8),
    #[error("{0} trailing bytes after last field")]
    TrailingBytes(usize),
}

/// A payload turned back into values. Scaled fields come back quantized.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DecodedUplink {
    pub format_id: u8,
    pub flags: UplinkFlags,
    pub battery_volts: Option<f32>,
    pub boot_count_lsb: Option<u8>,
    pub temperature: Option<f32>,
    pub relative_humidity: Option<f32>,
    pub co2_ppm: Option<f32>,
    /// Raw CO2 word, for bit-exact checks.
    pub co2_raw: Option<u16>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, field: &FieldSpec) -> Result<i32, PayloadError> {
        let end = self.pos + field.width;
        if end > self.bytes.len() {
            return Err(PayloadError::Truncated {
                needed: end,
                got: self.bytes.len(),
            });
        }
        let raw = field.take(&self.bytes[self.pos..end]);
        self.pos = end;
        Ok(raw)
    }
}

pub fn decode_payload(bytes: &[u8]) -> Result<DecodedUplink, PayloadError> {
    if bytes.len() < 2 {
        return Err(PayloadError::Truncated { needed: 2, got: bytes.len() });
    }
    let flags = UplinkFlags::from_bits(bytes[1]).ok_or(PayloadError::UnknownFlags(bytes[1]))?;
    let mut cur = Cursor { bytes, pos: 2 };

    let mut out = DecodedUplink {
        format_id: bytes[0],
        flags,
        battery_volts: None,
        boot_count_lsb: None,
        temperature: None,
        relative_humidity: None,
        co2_ppm: None,
        co2_raw: None,
    };

    if flags.battery() {
        let s = layout(Field::Battery);
        out.battery_volts = Some(s.from_raw(cur.take(s)?));
    }
    if flags.boot() {
        out.boot_count_lsb = Some(cur.take(layout(Field::Boot))? as u8);
    }
    if flags.temp_humidity() {
        let t = layout(Field::Temperature);
        let rh = layout(Field::Humidity);
        out.temperature = Some(t.from_raw(cur.take(t)?));
        out.relative_humidity = Some(rh.from_raw(cur.take(rh)?));
    }
    if flags.co2() {
        let s = layout(Field::Co2);
        let raw = cur.take(s)?;
        out.co2_raw = Some(raw as u16);
        out.co2_ppm = Some(s.from_raw(raw));
    }

    if cur.pos != bytes.len() {
        return Err(PayloadError::TrailingBytes(bytes.len() - cur.pos));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(co2: f32) -> Measurement {
        Measurement {
            co2_ppm: co2,
            temperature: 21.25,
            relative_humidity: 40.0,
        }
    }

    #[test]
    fn test_co2_zero_is_suppressed() {
        let enc = PayloadEncoder::default();
        let buf = enc.encode(&PayloadInputs {
            battery_volts: 3.3,
            boot_count: None,
            measurement: Some(reading(0.0)),
        });
        let flags = UplinkFlags::from_bits(buf[1]).unwrap();
        assert!(!flags.co2());
        assert!(flags.temp_humidity());
        // id, flags, battery, temp, rh
        assert_eq!(buf.len(), 2 + 2 + 2 + 2);
    }

    #[test]
    fn test_co2_bounded_float() {
        let enc = PayloadEncoder::default();
        let buf = enc.encode(&PayloadInputs {
            battery_volts: 3.3,
            boot_count: None,
            measurement: Some(reading(412.5)),
        });
        assert!(UplinkFlags::from_bits(buf[1]).unwrap().co2());
        let n = buf.len();
        let co2 = u16::from_be_bytes([buf[n - 2], buf[n - 1]]);
        assert_eq!(co2, libm::roundf(412.5 / 40000.0 * 65535.0) as u16);
        assert_eq!(co2, 676);
    }

    #[test]
    fn test_full_layout() {
        let enc = PayloadEncoder::new(0x1F);
        let buf = enc.encode(&PayloadInputs {
            battery_volts: 3.3,
            boot_count: Some(0x1_0203),
            measurement: Some(reading(800.0)),
        });
        assert_eq!(
            buf.as_slice(),
            &[
                0x1F, 0x0F, // id, all flags
                0x34, 0xCD, // 13517 = round(3.3 * 4096)
                0x03, // boot counter LSB
                0x10, 0x9A, // 4250 = 21.25 * 200
                0x66, 0x66, // 26214 = 40 * 655.35
                0x05, 0x1F, // 1311 = round(800 / 40000 * 65535)
            ]
        );
    }

    #[test]
    fn test_invalid_measurement_has_battery_only() {
        let buf = PayloadEncoder::default().encode(&PayloadInputs {
            battery_volts: 3.0,
            boot_count: None,
            measurement: None,
        });
        assert_eq!(buf.as_slice(), &[0x1F, UplinkFlags::BATTERY, 0x30, 0x00]);
    }

    #[test]
    fn test_rounding_and_saturation() {
        let b = layout(Field::Battery);
        assert_eq!(b.to_raw(1.0 / 8192.0), 1); // 0.5 rounds away from zero
        assert_eq!(b.to_raw(-1.0 / 8192.0), -1);
        let t = layout(Field::Temperature);
        assert_eq!(t.to_raw(500.0), i16::MAX as i32);
        assert_eq!(t.to_raw(-500.0), i16::MIN as i32);
        assert_eq!(t.to_raw(f32::NAN), 0);
        let rh = layout(Field::Humidity);
        assert_eq!(rh.to_raw(100.0), 65535);
        assert_eq!(rh.to_raw(120.0), 65535);
        assert_eq!(rh.to_raw(-3.0), 0);
    }

    #[test]
    fn test_decode_matches_encode() {
        let enc = PayloadEncoder::default();
        let buf = enc.encode(&PayloadInputs {
            battery_volts: 3.7,
            boot_count: Some(7),
            measurement: Some(Measurement {
                co2_ppm: 1234.0,
                temperature: -5.5,
                relative_humidity: 55.5,
            }),
        });
        let d = decode_payload(&buf).unwrap();
        assert_eq!(d.format_id, 0x1F);
        assert_eq!(d.boot_count_lsb, Some(7));
        assert!((d.battery_volts.unwrap() - 3.7).abs() < 1.0 / 4096.0);
        assert_eq!(d.temperature, Some(-5.5));
        assert!((d.relative_humidity.unwrap() - 55.5).abs() < 0.01);
        assert!((d.co2_ppm.unwrap() - 1234.0).abs() < 1.0);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            decode_payload(&[0x1F]),
            Err(PayloadError::Truncated { needed: 2, got: 1 })
        );
        assert_eq!(decode_payload(&[0x1F, 0x40]), Err(PayloadError::UnknownFlags(0x40)));
        assert_eq!(
            decode_payload(&[0x1F, 0x01, 0x30]),
            Err(PayloadError::Truncated { needed: 4, got: 3 })
        );
        assert_eq!(
            decode_payload(&[0x1F, 0x01, 0x30, 0x00, 0xAA]),
            Err(PayloadError::TrailingBytes(1))
        );
    }
}
