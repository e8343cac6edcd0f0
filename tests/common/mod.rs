#![allow(dead_code)]

use embedded_hal_mock::eh1::i2c::Transaction;

pub const ADDR: u8 = 0x73;

pub fn version(raw: u8) -> Transaction {
    Transaction::write_read(ADDR, vec![0x0F], vec![raw])
}

pub fn key(raw: u16) -> Transaction {
    Transaction::write_read(ADDR, vec![0x0A], raw.to_le_bytes().to_vec())
}

pub fn sample(raw: [u8; 3]) -> Transaction {
    Transaction::write_read(ADDR, vec![0x03], raw.to_vec())
}

pub fn probe_life(raw: u8) -> Transaction {
    Transaction::write_read(ADDR, vec![0x0E], vec![raw])
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

/// Records every requested delay in milliseconds
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub ms: Vec<u32>,
}

impl embedded_hal::delay::DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ms.push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ms.push(ms);
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.ms.push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.ms.push(ms);
    }
}
