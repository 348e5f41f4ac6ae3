use crate::domain::error::BridgeResult;
use crate::domain::frame::RawFrame;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Serial link state, owned by the frame source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Error => write!(f, "Error"),
        }
    }
}

/// Blocking producer of aligned frames.
///
/// The run loop moves the source onto the blocking pool for each call, so
/// implementations are never shared between threads.
pub trait FrameSource: Send + 'static {
    /// Human-readable name of the underlying link
    fn name(&self) -> &str;

    fn state(&self) -> ConnectionState;

    /// Block until a frame is available (`Some`) or the read timeout elapses (`None`).
    ///
    /// Fails with `ConnectionLost` once the link is unusable.
    fn read_frame(&mut self) -> BridgeResult<Option<RawFrame>>;

    /// Reopen the link with its original parameters.
    fn reconnect(&mut self) -> BridgeResult<()>;

    /// Bytes discarded while realigning the stream
    fn framing_errors(&self) -> u64;

    /// Release the link.
    fn close(&mut self);
}

/// Consumer of frames
#[async_trait]
pub trait FrameSink: Send + Sync {
    fn destination(&self) -> SocketAddr;

    /// Transmit the frame bytes unchanged.
    async fn send(&self, frame: &RawFrame) -> BridgeResult<()>;
}
