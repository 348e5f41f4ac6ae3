use crate::domain::config::{FlowControlConfig, ParityConfig, SerialConfig};
use crate::domain::error::{BridgeError, BridgeResult};
use serialport::{ClearBuffer, SerialPort, SerialPortBuilder};
use std::io::{self, Read};
use tracing::debug;

/// Opens the byte stream a frame reader consumes.
///
/// Called once at startup and again on every reconnection attempt.
pub trait PortOpener: Send + 'static {
    type Port: Read + Send + 'static;

    fn name(&self) -> &str;

    fn open(&mut self) -> io::Result<Self::Port>;
}

/// Opens an OS serial device through `serialport`.
#[derive(Debug, Clone)]
pub struct SystemPortOpener {
    config: SerialConfig,
    discard_on_open: bool,
}

impl SystemPortOpener {
    /// Validates the line parameters without touching the device.
    pub fn new(config: SerialConfig, discard_on_open: bool) -> BridgeResult<Self> {
        port_builder(&config)?;
        Ok(Self {
            config,
            discard_on_open,
        })
    }
}

impl PortOpener for SystemPortOpener {
    type Port = Box<dyn SerialPort>;

    fn name(&self) -> &str {
        &self.config.port
    }

    fn open(&mut self) -> io::Result<Self::Port> {
        let builder = port_builder(&self.config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        let port = builder.open().map_err(io::Error::from)?;

        if self.discard_on_open {
            port.clear(ClearBuffer::Input).map_err(io::Error::from)?;
            debug!(port = %self.config.port, "Discarded stale input bytes");
        }

        Ok(port)
    }
}

fn port_builder(config: &SerialConfig) -> BridgeResult<SerialPortBuilder> {
    let invalid = |message: String| BridgeError::Connection {
        port: config.port.clone(),
        source: io::Error::new(io::ErrorKind::InvalidInput, message),
    };

    let data_bits = match config.data_bits {
        5 => serialport::DataBits::Five,
        6 => serialport::DataBits::Six,
        7 => serialport::DataBits::Seven,
        8 => serialport::DataBits::Eight,
        other => return Err(invalid(format!("Invalid data bits: {}", other))),
    };

    let stop_bits = match config.stop_bits {
        1 => serialport::StopBits::One,
        2 => serialport::StopBits::Two,
        other => return Err(invalid(format!("Invalid stop bits: {}", other))),
    };

    let parity = match config.parity {
        ParityConfig::None => serialport::Parity::None,
        ParityConfig::Even => serialport::Parity::Even,
        ParityConfig::Odd => serialport::Parity::Odd,
    };

    let flow_control = match config.flow_control {
        FlowControlConfig::None => serialport::FlowControl::None,
        FlowControlConfig::Software => serialport::FlowControl::Software,
        FlowControlConfig::Hardware => serialport::FlowControl::Hardware,
    };

    Ok(serialport::new(&config.port, config.baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(flow_control)
        .timeout(config.timeout()))
}
