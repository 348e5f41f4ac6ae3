use crate::cli::args::OutputFormat;
use crate::core::bridge::BridgeStatistics;
use crate::domain::config::BridgeConfig;
use crate::domain::frame::{RawFrame, TelemetrySample};
use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use std::io;
use tabled::{Table, Tabled};

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_sample(&self, frame: &RawFrame, sample: &TelemetrySample) -> Result<(), OutputError>;
    fn write_ports(&self, ports: &[PortSummary]) -> Result<(), OutputError>;
    fn write_config(&self, config: &BridgeConfig) -> Result<(), OutputError>;
    fn write_statistics(&self, stats: &BridgeStatistics) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::BridgeError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// A serial port as listed by `canbridge ports`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSummary {
    pub name: String,
    pub kind: String,
    pub description: String,
}

impl From<&SerialPortInfo> for PortSummary {
    fn from(info: &SerialPortInfo) -> Self {
        let (kind, description) = match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                let product = usb
                    .product
                    .clone()
                    .or_else(|| usb.manufacturer.clone())
                    .unwrap_or_default();
                (
                    "usb",
                    format!("{:04x}:{:04x} {}", usb.vid, usb.pid, product)
                        .trim_end()
                        .to_string(),
                )
            }
            SerialPortType::PciPort => ("pci", String::new()),
            SerialPortType::BluetoothPort => ("bluetooth", String::new()),
            SerialPortType::Unknown => ("unknown", String::new()),
        };

        Self {
            name: info.port_name.clone(),
            kind: kind.to_string(),
            description,
        }
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render_sample(&self, frame: &RawFrame, sample: &TelemetrySample) -> Result<String, OutputError> {
        Ok(match self.format {
            OutputFormat::Text => format!("[{}] {}", frame, sample),
            OutputFormat::Json => serde_json::to_string_pretty(&DecodedFrame {
                frame: frame.to_string(),
                sample,
            })?,
            OutputFormat::Table => Table::new(vec![SampleTableRow::new(frame, sample)]).to_string(),
        })
    }

    pub fn render_ports(&self, ports: &[PortSummary]) -> Result<String, OutputError> {
        Ok(match self.format {
            OutputFormat::Text => {
                if ports.is_empty() {
                    return Ok("No serial ports found".to_string());
                }
                ports
                    .iter()
                    .map(|port| {
                        if port.description.is_empty() {
                            format!("{} ({})", port.name, port.kind)
                        } else {
                            format!("{} ({}, {})", port.name, port.kind, port.description)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            OutputFormat::Json => serde_json::to_string_pretty(ports)?,
            OutputFormat::Table => Table::new(ports.iter().map(PortTableRow::from)).to_string(),
        })
    }

    pub fn render_config(&self, config: &BridgeConfig) -> Result<String, OutputError> {
        Ok(match self.format {
            OutputFormat::Text => toml::to_string_pretty(config)?,
            OutputFormat::Json => serde_json::to_string_pretty(config)?,
            OutputFormat::Table => Table::new(config_rows(config)).to_string(),
        })
    }

    pub fn render_statistics(&self, stats: &BridgeStatistics) -> Result<String, OutputError> {
        Ok(match self.format {
            OutputFormat::Text => {
                let mut lines = vec!["Bridge statistics:".to_string()];
                lines.extend(
                    statistics_rows(stats)
                        .into_iter()
                        .map(|row| format!("  {}: {}", row.key, row.value)),
                );
                lines.join("\n")
            }
            OutputFormat::Json => serde_json::to_string_pretty(stats)?,
            OutputFormat::Table => Table::new(statistics_rows(stats)).to_string(),
        })
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_sample(&self, frame: &RawFrame, sample: &TelemetrySample) -> Result<(), OutputError> {
        println!("{}", self.render_sample(frame, sample)?);
        Ok(())
    }

    fn write_ports(&self, ports: &[PortSummary]) -> Result<(), OutputError> {
        println!("{}", self.render_ports(ports)?);
        Ok(())
    }

    fn write_config(&self, config: &BridgeConfig) -> Result<(), OutputError> {
        println!("{}", self.render_config(config)?);
        Ok(())
    }

    fn write_statistics(&self, stats: &BridgeStatistics) -> Result<(), OutputError> {
        println!("{}", self.render_statistics(stats)?);
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct DecodedFrame<'a> {
    frame: String,
    #[serde(flatten)]
    sample: &'a TelemetrySample,
}

/// Table row for a decoded frame
#[derive(Tabled)]
struct SampleTableRow {
    frame: String,
    can_id: String,
    raw_value: u16,
    voltage: String,
}

impl SampleTableRow {
    fn new(frame: &RawFrame, sample: &TelemetrySample) -> Self {
        Self {
            frame: frame.to_string(),
            can_id: format!("0x{:04X}", sample.can_id),
            raw_value: sample.raw_millivolts,
            voltage: format!("{:.3} V", sample.voltage),
        }
    }
}

/// Table row for a serial port
#[derive(Tabled)]
struct PortTableRow {
    port: String,
    kind: String,
    description: String,
}

impl From<&PortSummary> for PortTableRow {
    fn from(port: &PortSummary) -> Self {
        Self {
            port: port.name.clone(),
            kind: port.kind.clone(),
            description: port.description.clone(),
        }
    }
}

/// Key/value row for configuration and statistics tables
#[derive(Tabled)]
struct SettingRow {
    key: String,
    value: String,
}

fn row(key: &str, value: impl ToString) -> SettingRow {
    SettingRow {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn config_rows(config: &BridgeConfig) -> Vec<SettingRow> {
    let allowed = if config.framing.allowed_can_ids.is_empty() {
        "any".to_string()
    } else {
        config
            .framing
            .allowed_can_ids
            .iter()
            .map(|id| format!("0x{:03X}", id))
            .collect::<Vec<_>>()
            .join(", ")
    };

    vec![
        row("logging.level", &config.logging.level),
        row("logging.format", format!("{:?}", config.logging.format).to_lowercase()),
        row("serial.port", &config.serial.port),
        row("serial.baud_rate", config.serial.baud_rate),
        row("serial.timeout_ms", config.serial.timeout_ms),
        row("destination", config.destination.target()),
        row("framing.policy", format!("{:?}", config.framing.policy).to_lowercase()),
        row("framing.max_can_id", format!("0x{:03X}", config.framing.max_can_id)),
        row("framing.max_raw_value", config.framing.max_raw_value),
        row("framing.allowed_can_ids", allowed),
        row(
            "framing.max_step",
            config
                .framing
                .max_step
                .map_or_else(|| "none".to_string(), |step| step.to_string()),
        ),
        row("reconnect.max_attempts", config.reconnect.max_attempts),
        row("bridge.idle_interval_ms", config.bridge.idle_interval_ms),
    ]
}

fn statistics_rows(stats: &BridgeStatistics) -> Vec<SettingRow> {
    vec![
        row("frames received", stats.frames_received),
        row("frames forwarded", stats.frames_forwarded),
        row("send errors", stats.send_errors),
        row("framing errors", stats.framing_errors),
        row("idle polls", stats.idle_polls),
        row("connection losses", stats.connection_losses),
        row("reconnects", format!("{}/{}", stats.reconnects, stats.reconnect_attempts)),
        row("uptime", format!("{:.1}s", stats.uptime.as_secs_f64())),
    ]
}
