//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry Relay - wearable serial telemetry to CSV and a remote collector
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-relay",
    author,
    version,
    about = "Wearable telemetry relay",
    long_about = "Reads newline-delimited JSON telemetry from a serial device (or file/stdin),\n\
                  persists every sample to CSV, renders a live dashboard and relays movement\n\
                  and vital metrics to a remote HTTP collector."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEMETRY_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Filter applied when `RUST_LOG` is unset
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Check that the collector answers
    Ping(PingArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when absent
    #[arg(short, long, env = "TELEMETRY_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serial device or capture file, `-` for stdin (overrides source.path)
    #[arg(short, long, env = "TELEMETRY_RELAY_SOURCE")]
    pub source: Option<PathBuf>,

    /// Override collector base URL
    #[arg(long, env = "TELEMETRY_RELAY_COLLECTOR_URL")]
    pub collector_url: Option<String>,

    /// Run without sending anything to the collector
    #[arg(long)]
    pub offline: bool,

    /// Override CSV output path
    #[arg(long, env = "TELEMETRY_RELAY_CSV")]
    pub csv: Option<PathBuf>,

    /// Do not write a CSV file
    #[arg(long, conflicts_with = "csv")]
    pub no_csv: bool,

    /// Do not render the live dashboard
    #[arg(long)]
    pub no_dashboard: bool,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TELEMETRY_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TELEMETRY_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

impl RunArgs {
    pub fn overrides(&self) -> config_loader::Overrides {
        config_loader::Overrides {
            source: self.source.clone(),
            collector_url: self.collector_url.clone(),
            offline: self.offline,
            csv_path: self.csv.clone(),
            no_csv: self.no_csv,
        }
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults apply when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the effective configuration as TOML
    #[arg(long, conflicts_with = "json")]
    pub toml: bool,
}

/// Arguments for the `ping` command
#[derive(Parser, Debug)]
pub struct PingArgs {
    /// Path to configuration file; defaults apply when absent
    #[arg(short, long, env = "TELEMETRY_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override collector base URL
    #[arg(long, env = "TELEMETRY_RELAY_COLLECTOR_URL")]
    pub collector_url: Option<String>,

    /// Seconds to wait for an answer
    #[arg(long, default_value = "5")]
    pub timeout: u64,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::parse_from([
            "telemetry-relay",
            "-v",
            "run",
            "--source",
            "-",
            "--collector-url",
            "http://10.0.0.2:8000",
            "--no-csv",
            "--timeout",
            "30",
        ]);
        assert_eq!(cli.default_log_level(), "debug");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.source, Some(PathBuf::from("-")));
                assert_eq!(args.collector_url.as_deref(), Some("http://10.0.0.2:8000"));
                assert!(args.no_csv);
                assert_eq!(args.timeout, 30);
                assert!(args.config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["telemetry-relay", "-q", "-v", "info"]).is_err());
        let cli = Cli::parse_from(["telemetry-relay", "-q", "info"]);
        assert_eq!(cli.default_log_level(), "warn");
    }

    #[test]
    fn test_csv_flags_conflict() {
        assert!(
            Cli::try_parse_from(["telemetry-relay", "run", "--csv", "a.csv", "--no-csv"]).is_err()
        );
    }
}
