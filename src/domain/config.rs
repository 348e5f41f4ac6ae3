use crate::domain::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// CanBridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Serial link settings
    #[serde(default)]
    pub serial: SerialConfig,
    /// UDP destination settings
    #[serde(default)]
    pub destination: DestinationConfig,
    /// Frame alignment settings
    #[serde(default)]
    pub framing: FramingConfig,
    /// Reconnection budget and backoff
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Run loop settings
    #[serde(default)]
    pub bridge: LoopConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Serial connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyTHS1`
    #[serde(default = "default_serial_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: ParityConfig,
    #[serde(default)]
    pub flow_control: FlowControlConfig,
    /// Read timeout in milliseconds
    #[serde(default = "default_read_timeout")]
    pub timeout_ms: u64,
    /// Consecutive failed reads before the link is considered lost
    #[serde(default = "default_max_io_errors")]
    pub max_consecutive_io_errors: u32,
}

/// Parity configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParityConfig {
    #[default]
    None,
    Odd,
    Even,
}

/// Flow control configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlConfig {
    #[default]
    None,
    Hardware,
    Software,
}

/// UDP destination configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Destination host name or IP address
    #[serde(default = "default_destination_host")]
    pub host: String,
    /// Destination UDP port
    #[serde(default = "default_destination_port")]
    pub port: u16,
    /// Local address to bind; an ephemeral port of the destination's family when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<SocketAddr>,
}

/// How the reader keeps 4-byte frames aligned on an undelimited stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResyncPolicy {
    /// Every 4 bytes form a frame; a lost byte misaligns everything after it.
    Strict,
    /// Implausible candidates are rejected one byte at a time until alignment returns.
    #[default]
    Resync,
}

/// Frame alignment and plausibility configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramingConfig {
    #[serde(default)]
    pub policy: ResyncPolicy,
    /// Largest accepted CAN id (11-bit standard identifiers by default)
    #[serde(default = "default_max_can_id")]
    pub max_can_id: u16,
    /// Largest accepted raw value in millivolts
    #[serde(default = "default_max_raw_value")]
    pub max_raw_value: u16,
    /// Accepted CAN ids; empty accepts any id up to `max_can_id`
    #[serde(default)]
    pub allowed_can_ids: Vec<u16>,
    /// Largest accepted change in millivolts between consecutive frames of one CAN id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_step: Option<u16>,
    /// Clear the OS input buffer right after opening the port
    #[serde(default = "default_discard_on_open")]
    pub discard_on_open: bool,
}

/// Reconnection backoff strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Fixed,
    #[default]
    Exponential,
}

/// Reconnection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnection attempts before a lost link becomes fatal
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub strategy: BackoffStrategy,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

/// Run loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Pause after a read that returned no data
    #[serde(default = "default_idle_interval")]
    pub idle_interval_ms: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_serial_port() -> String {
    "/dev/ttyTHS1".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_read_timeout() -> u64 {
    1000
}

fn default_max_io_errors() -> u32 {
    3
}

fn default_destination_host() -> String {
    "127.0.0.1".to_string()
}

fn default_destination_port() -> u16 {
    12345
}

fn default_max_can_id() -> u16 {
    0x07FF
}

fn default_max_raw_value() -> u16 {
    3300
}

fn default_discard_on_open() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    8000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_idle_interval() -> u64 {
    10
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: ParityConfig::default(),
            flow_control: FlowControlConfig::default(),
            timeout_ms: default_read_timeout(),
            max_consecutive_io_errors: default_max_io_errors(),
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            host: default_destination_host(),
            port: default_destination_port(),
            bind_addr: None,
        }
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            policy: ResyncPolicy::default(),
            max_can_id: default_max_can_id(),
            max_raw_value: default_max_raw_value(),
            allowed_can_ids: Vec::new(),
            max_step: None,
            discard_on_open: default_discard_on_open(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strategy: BackoffStrategy::default(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            idle_interval_ms: default_idle_interval(),
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DestinationConfig {
    /// `host:port` as given, before resolution.
    pub fn target(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl LoopConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}

impl BridgeConfig {
    /// Reject settings the bridge cannot run with.
    pub fn validate(&self) -> BridgeResult<()> {
        let serial = &self.serial;
        if serial.port.trim().is_empty() {
            return Err(BridgeError::config("serial.port must not be empty"));
        }
        if serial.baud_rate == 0 {
            return Err(BridgeError::config("serial.baud_rate must be greater than 0"));
        }
        if !(5..=8).contains(&serial.data_bits) {
            return Err(BridgeError::config(format!(
                "serial.data_bits must be between 5 and 8, got {}",
                serial.data_bits
            )));
        }
        if !(1..=2).contains(&serial.stop_bits) {
            return Err(BridgeError::config(format!(
                "serial.stop_bits must be 1 or 2, got {}",
                serial.stop_bits
            )));
        }
        if serial.timeout_ms == 0 {
            return Err(BridgeError::config("serial.timeout_ms must be greater than 0"));
        }
        if serial.max_consecutive_io_errors == 0 {
            return Err(BridgeError::config(
                "serial.max_consecutive_io_errors must be greater than 0",
            ));
        }

        if self.destination.host.trim().is_empty() {
            return Err(BridgeError::config("destination.host must not be empty"));
        }
        if self.destination.port == 0 {
            return Err(BridgeError::config("destination.port must not be 0"));
        }

        let framing = &self.framing;
        if let Some(id) = framing
            .allowed_can_ids
            .iter()
            .find(|id| **id > framing.max_can_id)
        {
            return Err(BridgeError::config(format!(
                "framing.allowed_can_ids contains 0x{:04X}, above max_can_id 0x{:04X}",
                id, framing.max_can_id
            )));
        }

        let reconnect = &self.reconnect;
        if reconnect.multiplier.is_nan() || reconnect.multiplier < 1.0 {
            return Err(BridgeError::config(format!(
                "reconnect.multiplier must be at least 1.0, got {}",
                reconnect.multiplier
            )));
        }
        if reconnect.max_delay_ms < reconnect.initial_delay_ms {
            return Err(BridgeError::config(
                "reconnect.max_delay_ms must not be below reconnect.initial_delay_ms",
            ));
        }

        Ok(())
    }
}
