use clap::{Parser, Subcommand};

pub mod output;

pub use output::{print_instruments, InstrumentRow, OutputMode};

#[derive(Parser, Debug)]
#[command(name = "voltrigger")]
#[command(version)]
#[command(about = "Volatility-triggered trade poller", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (reads default.toml, then $VOLTRIGGER_ENV)
    #[arg(short, long, default_value = "config", env = "VOLTRIGGER_CONFIG_DIR")]
    pub config: String,

    /// Print tables as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the poller until Ctrl+C
    Run {
        /// Override poller.tick_interval_ms
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Validate the configuration and list instruments
    Check,
    /// Fetch the current metric for one instrument from the configured source
    Probe {
        /// Instrument symbol or token address
        instrument: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "voltrigger",
            "--config",
            "/etc/voltrigger",
            "run",
            "--interval-ms",
            "2500",
        ]);
        assert_eq!(cli.config, "/etc/voltrigger");
        match cli.command {
            Commands::Run {
                interval_ms,
                duration_secs,
            } => {
                assert_eq!(interval_ms, Some(2500));
                assert_eq!(duration_secs, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_probe() {
        let cli = Cli::parse_from(["voltrigger", "probe", "SEI/USDT", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Probe { ref instrument } if instrument == "SEI/USDT"));
    }
}
