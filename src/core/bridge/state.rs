use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeState {
    /// Opening the serial link and the UDP socket
    Initializing,
    /// Relaying frames
    Running,
    /// Serial link lost, reconnecting
    Degraded,
    /// Releasing resources
    ShuttingDown,
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeState::Initializing => write!(f, "Initializing"),
            BridgeState::Running => write!(f, "Running"),
            BridgeState::Degraded => write!(f, "Degraded"),
            BridgeState::ShuttingDown => write!(f, "ShuttingDown"),
        }
    }
}

/// Counters owned by one bridge run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatistics {
    /// Frames read from the serial link
    pub frames_received: u64,
    /// Frames handed to the UDP socket without error
    pub frames_forwarded: u64,
    /// Failed UDP sends
    pub send_errors: u64,
    /// Bytes discarded while realigning the stream
    pub framing_errors: u64,
    /// Reads that timed out with no data
    pub idle_polls: u64,
    /// Times the serial link was lost
    pub connection_losses: u64,
    /// Reconnection attempts made
    pub reconnect_attempts: u64,
    /// Reconnection attempts that succeeded
    pub reconnects: u64,
    /// Wall time between entering Running and shutdown
    pub uptime: Duration,
}

impl BridgeStatistics {
    /// Errors of every kind seen during the run.
    pub fn total_errors(&self) -> u64 {
        let failed_reconnects = self.reconnect_attempts.saturating_sub(self.reconnects);
        self.send_errors + self.framing_errors + self.connection_losses + failed_reconnects
    }
}
