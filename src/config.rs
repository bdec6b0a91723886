use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::domain::{InstrumentSpec, TradeSide, DEFAULT_COOLDOWN_MS};
use crate::poller::PollerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub instruments: Vec<InstrumentSpec>,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which metric source feeds the poller
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Random volatility in `[0, max_volatility_pct)`
    #[default]
    Simulated,
    /// Fixed values from `source.values`
    Static,
    /// `GET {base_url}/volatility/{instrument}`
    Http,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Simulated => write!(f, "simulated"),
            SourceKind::Static => write!(f, "static"),
            SourceKind::Http => write!(f, "http"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticValue {
    pub instrument: String,
    pub volatility: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    /// Base URL for the HTTP source
    #[serde(default)]
    pub base_url: Option<String>,
    /// Optional timeframe query parameter for the HTTP source (e.g. "1h")
    #[serde(default)]
    pub timeframe: Option<String>,
    /// Upper bound of simulated volatility in percent
    #[serde(default = "default_max_volatility_pct")]
    pub max_volatility_pct: f64,
    /// Fixed seed for the simulated source
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub values: Vec<StaticValue>,
}

fn default_max_volatility_pct() -> f64 {
    20.0
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Simulated,
            base_url: None,
            timeframe: None,
            max_volatility_pct: default_max_volatility_pct(),
            seed: None,
            values: Vec::new(),
        }
    }
}

impl SourceConfig {
    pub fn static_values(&self) -> HashMap<String, Decimal> {
        self.values
            .iter()
            .map(|v| (v.instrument.clone(), v.volatility))
            .collect()
    }
}

/// Where fired intents go
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Log only
    #[default]
    DryRun,
    /// Append JSON lines to `sink.journal_path`
    Journal,
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::DryRun => write!(f, "dry_run"),
            SinkKind::Journal => write!(f, "journal"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    #[serde(default)]
    pub journal_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("poller.tick_interval_ms", 15_000)?
            .set_default("poller.fetch_timeout_ms", 3_000)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("VOLTRIGGER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (VOLTRIGGER__POLLER__TICK_INTERVAL_MS, etc.)
            .add_source(
                Environment::with_prefix("VOLTRIGGER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Demo configuration used when no config file is present
    pub fn default_config() -> Self {
        Self {
            poller: PollerConfig::default(),
            instruments: vec![
                InstrumentSpec::new("SEI/USDT", dec!(10), DEFAULT_COOLDOWN_MS),
                InstrumentSpec::new("SEI/ETH", dec!(12), DEFAULT_COOLDOWN_MS)
                    .with_side(TradeSide::Sell),
            ],
            source: SourceConfig::default(),
            sink: SinkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Register the demo instruments when none are configured.
    ///
    /// Returns `true` if the demo set was applied. Every other loaded
    /// setting is kept.
    pub fn fill_demo_instruments(&mut self) -> bool {
        if !self.instruments.is_empty() {
            return false;
        }
        self.instruments = Self::default_config().instruments;
        true
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(mut poller_errors) = self.poller.validate() {
            errors.append(&mut poller_errors);
        }

        let mut seen = HashSet::new();
        for spec in &self.instruments {
            if let Err(e) = spec.validate() {
                errors.push(e.to_string());
            }
            if !seen.insert(spec.id.as_str()) {
                errors.push(format!("instrument {} configured more than once", spec.id));
            }
        }

        match self.source.kind {
            SourceKind::Http => {
                if self
                    .source
                    .base_url
                    .as_deref()
                    .map(|u| u.trim().is_empty())
                    .unwrap_or(true)
                {
                    errors.push("source.base_url is required for the http source".to_string());
                }
            }
            SourceKind::Simulated => {
                let max = self.source.max_volatility_pct;
                if !max.is_finite() || max <= 0.0 || max > 100.0 {
                    errors.push("source.max_volatility_pct must be in (0, 100]".to_string());
                }
            }
            SourceKind::Static => {
                if self.source.values.is_empty() {
                    errors.push("source.values must not be empty for the static source".to_string());
                }
            }
        }

        if self.sink.kind == SinkKind::Journal
            && self
                .sink
                .journal_path
                .as_deref()
                .map(|p| p.trim().is_empty())
                .unwrap_or(true)
        {
            errors.push("sink.journal_path is required for the journal sink".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
