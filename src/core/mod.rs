// Core module - Framing, transport seams and the bridge run loop
pub mod bridge;
pub mod framing;
pub mod transport;

pub use bridge::{BridgeLoop, BridgeSettings, BridgeState, BridgeStatistics};
pub use framing::{Alignment, FrameAligner, PlausibilityCheck};
pub use transport::{ConnectionState, FrameSink, FrameSource};
