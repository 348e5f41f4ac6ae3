// Serial module - Serial link and frame acquisition
pub mod port;
pub mod reader;

pub use port::{PortOpener, SystemPortOpener};
pub use reader::SerialFrameReader;
