//! CanBridge Library
//!
//! Serial-to-UDP bridge for fixed 4-byte CAN telemetry frames: frame
//! acquisition and resynchronization, decoding, and supervised forwarding
//! with reconnection.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::bridge::{connect, BridgeLoop, BridgeSettings, BridgeState, BridgeStatistics};
pub use crate::core::framing::{FrameAligner, PlausibilityCheck};
pub use crate::core::transport::{ConnectionState, FrameSink, FrameSource};
pub use domain::config::BridgeConfig;
pub use domain::error::{BridgeError, BridgeResult, FramingError};
pub use domain::frame::{decode, RawFrame, TelemetrySample};
pub use infrastructure::serial::SerialFrameReader;
pub use infrastructure::udp::UdpForwarder;
