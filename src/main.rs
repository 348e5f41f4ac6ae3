// CanBridge - Serial-to-UDP telemetry bridge
use anyhow::Context;
use canbridge::cli::args::Args;
use canbridge::cli::commands::execute_command;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let command = args.command.name();

    execute_command(args)
        .await
        .with_context(|| format!("canbridge {} failed", command))
}
