// src/sensor/mock.rs
//
// Test doubles: a register-level SCD30 simulation on a mock bus, and a clock
// that only moves when told to (or when the driver delays).

use std::cell::Cell;
use std::rc::Rc;
use std::vec::Vec;

use crate::common::{
    crc::{crc8, encode_group},
    hal_traits::{MillisClock, Scd30Bus, Scd30Timer},
    types::Measurement,
};

// --- Mock Comm Error ---
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MockCommError;

// --- Mock Timer ---
#[derive(Debug, Clone, Default)]
pub struct MockTimer {
    now: Rc<Cell<u32>>,
}

impl MockTimer {
    pub fn new(start_ms: u32) -> Self {
        Self { now: Rc::new(Cell::new(start_ms)) }
    }

    /// A timer driven by a clock shared with other test doubles.
    pub fn shared(now: Rc<Cell<u32>>) -> Self {
        Self { now }
    }

    /// Another handle on the same clock.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }
}

impl MillisClock for MockTimer {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

impl Scd30Timer for MockTimer {
    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

// --- Simulated device ---
#[derive(Debug, Clone)]
pub struct FakeScd30 {
    pub firmware: u16,
    pub interval: u16,
    pub asc: u16,
    pub frc: u16,
    pub temp_offset: u16,
    pub altitude: u16,
    pub measuring: bool,
    pub data_ready: bool,
    pub measurement: Measurement,
    pub pressure: Option<u16>,

    // fault injection
    pub fail_writes: usize,
    pub fail_reads: usize,
    pub corrupt_next_read: bool,
    pub ignore_sets: bool,
    pub short_write: bool,
    /// Command code whose writes are refused.
    pub reject: Option<u16>,

    pub writes: Vec<Vec<u8>>,
    pending: Vec<u16>,
}

impl Default for FakeScd30 {
    fn default() -> Self {
        Self {
            firmware: 0x0342,
            interval: 2,
            asc: 0,
            frc: 400,
            temp_offset: 0,
            altitude: 0,
            measuring: false,
            data_ready: false,
            measurement: Measurement::default(),
            pressure: None,
            fail_writes: 0,
            fail_reads: 0,
            corrupt_next_read: false,
            ignore_sets: false,
            short_write: false,
            reject: None,
            writes: Vec::new(),
            pending: Vec::new(),
        }
    }
}

impl FakeScd30 {
    /// Command codes written so far, in order.
    pub fn commands(&self) -> Vec<u16> {
        self.writes
            .iter()
            .map(|w| u16::from_be_bytes([w[0], w[1]]))
            .collect()
    }

    pub fn count(&self, code: u16) -> usize {
        self.commands().iter().filter(|c| **c == code).count()
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
    }

    fn float_words(v: f32) -> [u16; 2] {
        let bits = v.to_bits();
        [(bits >> 16) as u16, bits as u16]
    }

    fn register(&mut self, code: u16) -> Option<&mut u16> {
        match code {
            0x4600 => Some(&mut self.interval),
            0x5102 => Some(&mut self.altitude),
            0x5204 => Some(&mut self.frc),
            0x5306 => Some(&mut self.asc),
            0x5403 => Some(&mut self.temp_offset),
            _ => None,
        }
    }
}

impl Scd30Bus for FakeScd30 {
    type Error = MockCommError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<usize, Self::Error> {
        assert_eq!(address, 0x61);
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(MockCommError);
        }
        if self.reject == Some(u16::from_be_bytes([bytes[0], bytes[1]])) {
            return Err(MockCommError);
        }
        if self.short_write {
            return Ok(bytes.len() - 1);
        }
        self.writes.push(bytes.to_vec());

        let code = u16::from_be_bytes([bytes[0], bytes[1]]);
        let param = if bytes.len() == 5 {
            assert_eq!(crc8(&bytes[2..4]), bytes[4], "bad parameter CRC in {:02x?}", bytes);
            Some(u16::from_be_bytes([bytes[2], bytes[3]]))
        } else {
            assert_eq!(bytes.len(), 2);
            None
        };

        self.pending.clear();
        match (code, param) {
            (0x0010, Some(p)) => {
                self.measuring = true;
                self.pressure = Some(p);
            }
            (0x0104, None) => self.measuring = false,
            (0x0202, None) => self.pending.push(self.data_ready as u16),
            (0x0300, None) => {
                let m = self.measurement;
                for v in [m.co2_ppm, m.temperature, m.relative_humidity] {
                    self.pending.extend_from_slice(&Self::float_words(v));
                }
                self.data_ready = false;
            }
            (0xD100, None) => self.pending.push(self.firmware),
            (0xD304, None) => {}
            (code, Some(p)) => {
                let ignore = self.ignore_sets;
                if let Some(reg) = self.register(code) {
                    if !ignore {
                        *reg = p;
                    }
                }
            }
            (code, None) => {
                if let Some(reg) = self.register(code) {
                    let v = *reg;
                    self.pending.push(v);
                }
            }
        }
        Ok(bytes.len())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        assert_eq!(address, 0x61);
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(MockCommError);
        }
        let mut raw = Vec::new();
        for word in self.pending.drain(..) {
            raw.extend_from_slice(&encode_group(word));
        }
        if self.corrupt_next_read && !raw.is_empty() {
            raw[2] ^= 0x01;
            self.corrupt_next_read = false;
        }
        let n = raw.len().min(buf.len());
        buf[..n].copy_from_slice(&raw[..n]);
        Ok(raw.len())
    }
}
