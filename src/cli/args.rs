use crate::domain::config::{BridgeConfig, ResyncPolicy};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments for canbridge
#[derive(Parser, Debug)]
#[command(
    name = "canbridge",
    version = env!("CARGO_PKG_VERSION"),
    about = "Serial-to-UDP bridge for CAN telemetry frames",
    long_about = "Reads fixed 4-byte telemetry frames (CAN id + millivolt reading) from a serial link, logs the decoded samples and forwards each frame verbatim as one UDP datagram."
)]
pub struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Log level forced by `-v` or `-q`, if any.
    pub fn log_level_override(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bridge until interrupted
    Run(RunArgs),
    /// List available serial ports
    Ports,
    /// Decode one frame given as hex
    Decode {
        /// Four bytes as hex, e.g. "01230CE4" or "01 23 0C E4"
        frame: String,
    },
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Run(_) => "run",
            Command::Ports => "ports",
            Command::Decode { .. } => "decode",
            Command::Config(_) => "config",
            Command::Version => "version",
        }
    }
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
}

/// Overrides applied on top of the loaded configuration
#[derive(ClapArgs, Debug, Default)]
pub struct RunArgs {
    /// Serial port path
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Destination host
    #[arg(long)]
    pub host: Option<String>,

    /// Destination UDP port
    #[arg(long)]
    pub dest_port: Option<u16>,

    /// Stream alignment policy
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(host) = &self.host {
            config.destination.host = host.clone();
        }
        if let Some(dest_port) = self.dest_port {
            config.destination.port = dest_port;
        }
        if let Some(policy) = self.policy {
            config.framing.policy = policy.into();
        }
    }
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate a configuration file
    Validate {
        /// Configuration file path
        file: Option<PathBuf>,
    },
    /// Write a default configuration file
    Init {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Resync policy argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    Strict,
    Resync,
}

impl From<PolicyArg> for ResyncPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Strict => Self::Strict,
            PolicyArg::Resync => Self::Resync,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
