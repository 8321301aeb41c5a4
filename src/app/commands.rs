//! Commands carried in RECV writes.
//!
//! The motor link defines byte 0 of a write as a signed 8-bit speed in
//! `[-100, 100]`. Trailing bytes are ignored. Range checking belongs to the
//! motor driver; decoding only fails on an empty write.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedCommand {
    pub speed: i8,
}

impl SpeedCommand {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let &raw = data.first().ok_or(Error::InvalidArgument)?;
        Ok(Self { speed: raw as i8 })
    }

    /// One-byte wire form, as echoed back on SEND.
    pub fn encode(self) -> [u8; 1] {
        [self.speed as u8]
    }
}
