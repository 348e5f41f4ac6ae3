use crate::domain::error::{BridgeError, FramingError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of one telemetry frame on the wire.
pub const FRAME_LEN: usize = 4;

/// Millivolts per volt in the fixed-point raw value.
const MILLIVOLTS_PER_VOLT: f64 = 1000.0;

/// One 4-byte frame as read from the serial link.
///
/// Layout: `[can_id MSB, can_id LSB, raw MSB, raw LSB]`, both fields big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFrame([u8; FRAME_LEN]);

impl RawFrame {
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a frame from its two fields.
    pub fn from_parts(can_id: u16, raw_value: u16) -> Self {
        let [id_hi, id_lo] = can_id.to_be_bytes();
        let [raw_hi, raw_lo] = raw_value.to_be_bytes();
        Self([id_hi, id_lo, raw_hi, raw_lo])
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn can_id(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    pub fn raw_value(&self) -> u16 {
        u16::from_be_bytes([self.0[2], self.0[3]])
    }

    pub fn decode(&self) -> TelemetrySample {
        decode(&self.0)
    }
}

impl From<[u8; FRAME_LEN]> for RawFrame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for RawFrame {
    type Error = BridgeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; FRAME_LEN] = bytes
            .try_into()
            .map_err(|_| FramingError::WrongLength { len: bytes.len() })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

/// Decoded telemetry reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub can_id: u16,
    pub raw_millivolts: u16,
    pub voltage: f64,
}

impl fmt::Display for TelemetrySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CAN ID = 0x{:04X} ({}), Raw Data = 0x{:04X} ({}), Voltage = {:.3} V",
            self.can_id, self.can_id, self.raw_millivolts, self.raw_millivolts, self.voltage
        )
    }
}

/// Decode a frame into a sample. Total over every 4-byte input.
pub fn decode(bytes: &[u8; FRAME_LEN]) -> TelemetrySample {
    let can_id = u16::from_be_bytes([bytes[0], bytes[1]]);
    let raw_millivolts = u16::from_be_bytes([bytes[2], bytes[3]]);

    TelemetrySample {
        can_id,
        raw_millivolts,
        voltage: f64::from(raw_millivolts) / MILLIVOLTS_PER_VOLT,
    }
}
