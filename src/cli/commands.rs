use crate::cli::args::{Args, Command, ConfigCommand, RunArgs};
use crate::cli::output::{ConsoleWriter, OutputWriter, PortSummary};
use crate::core::bridge;
use crate::domain::config::BridgeConfig;
use crate::domain::error::{BridgeError, BridgeResult};
use crate::domain::frame::RawFrame;
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use std::path::Path;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Execute CLI command
pub async fn execute_command(args: Args) -> BridgeResult<()> {
    let writer = ConsoleWriter::new(args.output);
    let config_manager = ConfigManager::new();

    match &args.command {
        Command::Run(run_args) => {
            let config = load_run_config(&config_manager, args.config.as_deref(), run_args)?;
            init_logging(&config.logging, args.log_level_override())?;
            run_bridge(&config, &writer).await
        }
        Command::Ports => execute_ports(&writer),
        Command::Decode { frame } => {
            let frame = parse_frame(frame)?;
            writer.write_sample(&frame, &frame.decode())?;
            Ok(())
        }
        Command::Config(config_args) => {
            execute_config_command(&config_args.command, &writer, &config_manager, args.config.as_deref())
        }
        Command::Version => {
            writer.write_message(&format!("canbridge {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Loaded configuration with the `run` flags applied on top.
pub fn load_run_config(
    config_manager: &ConfigManager,
    explicit: Option<&Path>,
    run_args: &RunArgs,
) -> BridgeResult<BridgeConfig> {
    let mut config = config_manager.read_config(explicit)?;
    run_args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run_bridge(config: &BridgeConfig, writer: &ConsoleWriter) -> BridgeResult<()> {
    let bridge = bridge::connect(config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signals = tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let result = bridge.run(shutdown_rx).await;
    signals.abort();

    let stats = result?;
    writer.write_statistics(&stats)?;
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Received shutdown signal");
}

fn execute_ports(writer: &ConsoleWriter) -> BridgeResult<()> {
    let ports = serialport::available_ports().map_err(|e| {
        BridgeError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to list serial ports: {}", e),
        ))
    })?;

    let summaries: Vec<PortSummary> = ports.iter().map(PortSummary::from).collect();
    writer.write_ports(&summaries)?;
    Ok(())
}

fn execute_config_command(
    command: &ConfigCommand,
    writer: &ConsoleWriter,
    config_manager: &ConfigManager,
    explicit: Option<&Path>,
) -> BridgeResult<()> {
    match command {
        ConfigCommand::Show => {
            let config = config_manager.load_config(explicit)?;
            writer.write_config(&config)?;
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            let target = file.as_deref().or(explicit);
            match config_manager.resolve(target) {
                Some(path) => {
                    config_manager.load_config(Some(&path))?;
                    writer.write_message(&format!(
                        "Configuration file '{}' is valid",
                        path.display()
                    ))?;
                }
                None => {
                    BridgeConfig::default().validate()?;
                    writer.write_message("No configuration file found; defaults are valid")?;
                }
            }
            Ok(())
        }
        ConfigCommand::Init { output, force } => {
            let path = output
                .clone()
                .unwrap_or_else(|| config_manager.default_init_path());
            ConfigManager::init_config(&path, *force)?;
            writer.write_message(&format!("Configuration initialized at '{}'", path.display()))?;
            Ok(())
        }
    }
}

/// Parse one frame written as hex. Whitespace and a `0x` prefix are ignored.
pub fn parse_frame(input: &str) -> BridgeResult<RawFrame> {
    let cleaned: String = input.split_whitespace().collect();
    let cleaned = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);

    let bytes = hex::decode(cleaned)
        .map_err(|e| BridgeError::InvalidInput(format!("Invalid hex frame '{}': {}", input, e)))?;
    RawFrame::try_from(bytes.as_slice())
}
