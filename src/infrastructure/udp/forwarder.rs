use crate::core::transport::FrameSink;
use crate::domain::config::DestinationConfig;
use crate::domain::error::{BridgeError, BridgeResult};
use crate::domain::frame::RawFrame;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, info};

/// Sends raw frames to one fixed UDP destination.
///
/// Each frame becomes exactly one datagram carrying its 4 bytes, nothing more.
#[derive(Debug)]
pub struct UdpForwarder {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl UdpForwarder {
    /// Resolve the destination once and bind a local socket for it.
    pub async fn bind(config: &DestinationConfig) -> BridgeResult<Self> {
        let target = config.target();
        let connection_error = |source: io::Error| BridgeError::Connection {
            port: target.clone(),
            source,
        };

        let destination = tokio::net::lookup_host((config.host.as_str(), config.port))
            .await
            .map_err(connection_error)?
            .next()
            .ok_or_else(|| {
                connection_error(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {}", config.host),
                ))
            })?;

        let local = config
            .bind_addr
            .unwrap_or_else(|| unspecified_for(&destination));
        let socket = UdpSocket::bind(local).await.map_err(connection_error)?;

        info!(
            destination = %destination,
            local = %socket.local_addr().map_err(connection_error)?,
            "UDP socket bound"
        );

        Ok(Self {
            socket,
            destination,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn local_addr(&self) -> BridgeResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl FrameSink for UdpForwarder {
    fn destination(&self) -> SocketAddr {
        self.destination
    }

    async fn send(&self, frame: &RawFrame) -> BridgeResult<()> {
        let payload = frame.as_bytes();
        let send_error = |source: io::Error| BridgeError::Send {
            destination: self.destination,
            source,
        };

        let sent = self
            .socket
            .send_to(payload, self.destination)
            .await
            .map_err(send_error)?;
        if sent != payload.len() {
            return Err(send_error(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", sent, payload.len()),
            )));
        }

        debug!(destination = %self.destination, bytes = sent, "Datagram sent");
        Ok(())
    }
}

fn unspecified_for(destination: &SocketAddr) -> SocketAddr {
    let ip = match destination {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, 0)
}
