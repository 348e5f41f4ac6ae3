use canbridge::cli::args::{Args, Command, ConfigCommand, OutputFormat, PolicyArg};
use clap::Parser;
use std::process::Command as Process;
use std::str;

/// CLI interface tests
#[cfg(test)]
mod cli_tests {
    use super::*;

    fn canbridge() -> Process {
        Process::new(env!("CARGO_BIN_EXE_canbridge"))
    }

    #[test]
    fn test_parse_run_overrides() {
        let args = Args::try_parse_from([
            "canbridge",
            "run",
            "--port",
            "/dev/ttyUSB0",
            "--baud",
            "9600",
            "--host",
            "10.0.0.2",
            "--dest-port",
            "5000",
            "--policy",
            "strict",
        ])
        .unwrap();

        match args.command {
            Command::Run(run) => {
                assert_eq!(run.port.as_deref(), Some("/dev/ttyUSB0"));
                assert_eq!(run.baud, Some(9600));
                assert_eq!(run.host.as_deref(), Some("10.0.0.2"));
                assert_eq!(run.dest_port, Some(5000));
                assert_eq!(run.policy, Some(PolicyArg::Strict));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let args = Args::try_parse_from(["canbridge", "-o", "json", "run", "-v", "-c", "bridge.toml"])
            .unwrap();
        assert_eq!(args.output, OutputFormat::Json);
        assert!(args.verbose);
        assert_eq!(args.log_level_override(), Some("debug"));
        assert_eq!(args.config.as_deref(), Some(std::path::Path::new("bridge.toml")));

        let args = Args::try_parse_from(["canbridge", "ports", "-q"]).unwrap();
        assert_eq!(args.log_level_override(), Some("error"));
        assert_eq!(args.output, OutputFormat::Text);

        assert!(Args::try_parse_from(["canbridge", "run", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_parse_config_subcommands() {
        let args =
            Args::try_parse_from(["canbridge", "config", "init", "--output", "out.toml", "--force"])
                .unwrap();
        match args.command {
            Command::Config(config) => match config.command {
                ConfigCommand::Init { output, force } => {
                    assert_eq!(output.as_deref(), Some(std::path::Path::new("out.toml")));
                    assert!(force);
                }
                other => panic!("unexpected config command: {:?}", other),
            },
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Args::try_parse_from(["canbridge", "config", "validate"]).is_ok());
        assert!(Args::try_parse_from(["canbridge", "config", "show"]).is_ok());
    }

    #[test]
    fn test_parse_rejects_unknown_policy() {
        assert!(Args::try_parse_from(["canbridge", "run", "--policy", "lenient"]).is_err());
        assert!(Args::try_parse_from(["canbridge"]).is_err());
    }

    #[test]
    fn test_cli_help() {
        let output = canbridge().arg("--help").output().expect("Failed to execute command");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains("Usage:"));
        assert!(stdout.contains("Commands:"));
        for command in ["run", "ports", "decode", "config", "version"] {
            assert!(stdout.contains(command), "help should list {}", command);
        }
    }

    #[test]
    fn test_cli_version() {
        let output = canbridge().arg("version").output().expect("Failed to execute command");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_cli_decode() {
        let output = canbridge()
            .args(["decode", "01 23 0C E4"])
            .output()
            .expect("Failed to execute command");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains("CAN ID = 0x0123 (291)"));
        assert!(stdout.contains("Raw Data = 0x0CE4 (3300)"));
        assert!(stdout.contains("Voltage = 3.300 V"));
    }

    #[test]
    fn test_cli_decode_json() {
        let output = canbridge()
            .args(["-o", "json", "decode", "000A03E8"])
            .output()
            .expect("Failed to execute command");
        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("decode should print JSON");

        assert_eq!(value["can_id"], 10);
        assert_eq!(value["raw_millivolts"], 1000);
        assert_eq!(value["voltage"], 1.0);
    }

    #[test]
    fn test_cli_decode_rejects_short_frame() {
        let output = canbridge()
            .args(["decode", "0123"])
            .output()
            .expect("Failed to execute command");
        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");

        assert!(!output.status.success());
        assert!(stderr.contains("4 bytes"));
    }

    #[test]
    fn test_cli_run_with_absent_device_fails() {
        let output = canbridge()
            .args(["run", "--port", "/dev/canbridge-absent", "-q"])
            .output()
            .expect("Failed to execute command");
        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");

        assert!(!output.status.success());
        assert!(stderr.contains("/dev/canbridge-absent"));
    }

    #[test]
    fn test_cli_config_init_and_validate() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("bridge.toml");
        let path_str = path.to_str().unwrap();

        let output = canbridge()
            .args(["config", "init", "--output", path_str])
            .output()
            .expect("Failed to execute command");
        assert!(output.status.success());
        assert!(path.exists());

        let output = canbridge()
            .args(["config", "validate", path_str])
            .output()
            .expect("Failed to execute command");
        assert!(output.status.success());

        let output = canbridge()
            .args(["-c", path_str, "config", "show"])
            .output()
            .expect("Failed to execute command");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(stdout.contains("[serial]"));
        assert!(stdout.contains("/dev/ttyTHS1"));
    }
}
