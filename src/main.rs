use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};
use voltrigger::bootstrap::{build_poller, build_source};
use voltrigger::cli::{print_instruments, Cli, Commands, OutputMode};
use voltrigger::config::AppConfig;
use voltrigger::domain::TrackedInstrument;
use voltrigger::error::{FetchError, Result, TriggerError};

mod main_runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mode = OutputMode::from_json_flag(cli.json);
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            interval_ms,
            duration_secs,
        } => {
            let _log_guard = main_runtime::init_logging(&config.logging);
            run_poller(config, interval_ms, duration_secs, mode).await?;
        }
        Commands::Check => {
            main_runtime::init_logging_simple();
            check_config(&config, mode)?;
        }
        Commands::Probe { instrument } => {
            main_runtime::init_logging_simple();
            probe_metric(&config, &instrument).await?;
        }
    }

    Ok(())
}

fn load_config(dir: &str) -> Result<AppConfig> {
    let mut config = AppConfig::load_from(dir)?;
    if config.fill_demo_instruments() {
        eprintln!("No instruments configured under {}, using demo instruments", dir);
    }
    Ok(config)
}

async fn run_poller(
    mut config: AppConfig,
    interval_ms: Option<u64>,
    duration_secs: Option<u64>,
    mode: OutputMode,
) -> Result<()> {
    if let Some(ms) = interval_ms {
        config.poller.tick_interval_ms = ms;
    }

    let poller = build_poller(&config).await?;
    if config.instruments.is_empty() {
        warn!("No instruments configured, poller will idle");
    }

    poller.start()?;
    info!("Poller running. Press Ctrl+C to stop.");

    match duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!(secs, "Run duration elapsed");
                }
                _ = main_runtime::shutdown_signal() => {
                    info!("Received shutdown signal");
                }
            }
        }
        None => {
            main_runtime::shutdown_signal().await;
            info!("Received shutdown signal");
        }
    }

    let totals = poller.system_stats().await;
    poller.stop().await;
    info!(
        trades = totals.total_trades,
        successful = totals.successful_trades,
        success_rate = %totals.success_rate,
        volume = %totals.total_volume,
        uptime_ms = totals.uptime_ms,
        "run summary"
    );
    print_instruments(&poller.instruments().await, mode)?;
    Ok(())
}

fn check_config(config: &AppConfig, mode: OutputMode) -> Result<()> {
    if let Err(errors) = config.validate() {
        for e in &errors {
            println!("\x1b[31m✗ {}\x1b[0m", e);
        }
        return Err(TriggerError::InvalidConfig(format!(
            "{} configuration problem(s)",
            errors.len()
        )));
    }

    println!(
        "\x1b[32m✓ Configuration OK\x1b[0m (tick {}ms, fetch timeout {}ms, policy {}, source {}, sink {})",
        config.poller.tick_interval_ms,
        config.poller.fetch_timeout_ms,
        config.poller.fire_policy,
        config.source.kind,
        config.sink.kind
    );
    let instruments: Vec<TrackedInstrument> = config
        .instruments
        .iter()
        .cloned()
        .map(TrackedInstrument::new)
        .collect();
    print_instruments(&instruments, mode)?;
    Ok(())
}

async fn probe_metric(config: &AppConfig, instrument: &str) -> Result<()> {
    let timeout_ms = config.poller.fetch_timeout_ms;
    let source = build_source(&config.source, timeout_ms)?;

    let metric = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        source.fetch_metric(instrument),
    )
    .await
    .map_err(|_| FetchError::Timeout {
        instrument: instrument.to_string(),
        elapsed_ms: timeout_ms,
    })??;

    match config.instruments.iter().find(|s| s.id == instrument) {
        Some(spec) => {
            let verdict = if metric > spec.threshold_pct {
                "above threshold"
            } else {
                "at or below threshold"
            };
            println!(
                "{}: {}% ({} {}%)",
                instrument, metric, verdict, spec.threshold_pct
            );
        }
        None => println!("{}: {}% (not configured)", instrument, metric),
    }
    Ok(())
}
