// UDP module - Datagram forwarding
pub mod forwarder;

pub use forwarder::UdpForwarder;
