use std::net::SocketAddr;
use thiserror::Error;

/// CanBridge unified error type
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Connection error: failed to open {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection lost on {port}: {source}")]
    ConnectionLost {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Send error to {destination}: {source}")]
    Send {
        destination: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Reconnection failed after {attempts} attempt(s)")]
    ReconnectExhausted {
        attempts: u32,
        #[source]
        last: Box<BridgeError>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Reasons a 4-byte candidate is not accepted as a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("frame must be exactly 4 bytes, got {len}")]
    WrongLength { len: usize },

    #[error("CAN id 0x{can_id:04X} exceeds maximum 0x{max:04X}")]
    CanIdOutOfRange { can_id: u16, max: u16 },

    #[error("CAN id 0x{can_id:04X} is not in the allowed set")]
    CanIdNotAllowed { can_id: u16 },

    #[error("raw value {raw_value} exceeds maximum {max}")]
    RawValueOutOfRange { raw_value: u16, max: u16 },

    #[error("raw value of CAN id 0x{can_id:04X} jumped from {previous} to {current} (max step {max_step})")]
    StepTooLarge {
        can_id: u16,
        previous: u16,
        current: u16,
        max_step: u16,
    },
}

pub type BridgeResult<T> = Result<T, BridgeError>;
