// Bridge module - Supervised serial-to-UDP relay
pub mod backoff;
pub mod state;
pub mod supervisor;

pub use backoff::Backoff;
pub use state::{BridgeState, BridgeStatistics};
pub use supervisor::{BridgeLoop, BridgeSettings};

use crate::domain::config::BridgeConfig;
use crate::domain::error::BridgeResult;
use crate::infrastructure::serial::SerialFrameReader;
use crate::infrastructure::udp::UdpForwarder;

/// Bridge over the configured serial device and UDP destination.
pub type SerialUdpBridge = BridgeLoop<SerialFrameReader, UdpForwarder>;

/// Open the serial link, then the UDP socket, as described by `config`.
pub async fn connect(config: &BridgeConfig) -> BridgeResult<SerialUdpBridge> {
    config.validate()?;
    BridgeLoop::initialize(
        BridgeSettings::from_config(config),
        || SerialFrameReader::open(&config.serial, &config.framing),
        || UdpForwarder::bind(&config.destination),
    )
    .await
}
