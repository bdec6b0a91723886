use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::TradeSide;
use crate::error::{Result, TriggerError};

/// Upper bound on a configurable cooldown (7 days)
pub const MAX_COOLDOWN_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Cooldown applied when none is configured (1 minute)
pub const DEFAULT_COOLDOWN_MS: u64 = 60_000;

/// Trade size applied when none is configured
pub const DEFAULT_TRADE_SIZE: Decimal = dec!(0.1);

/// Operator-supplied settings for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Symbol (e.g. "SEI/USDT") or token contract address
    pub id: String,
    /// Volatility threshold in percent, 0-100
    pub threshold_pct: Decimal,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default)]
    pub side: TradeSide,
    #[serde(default = "default_trade_size")]
    pub size: Decimal,
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN_MS
}

fn default_trade_size() -> Decimal {
    DEFAULT_TRADE_SIZE
}

impl InstrumentSpec {
    pub fn new(id: impl Into<String>, threshold_pct: Decimal, cooldown_ms: u64) -> Self {
        Self {
            id: id.into(),
            threshold_pct,
            cooldown_ms,
            side: TradeSide::Buy,
            size: DEFAULT_TRADE_SIZE,
        }
    }

    pub fn with_side(mut self, side: TradeSide) -> Self {
        self.side = side;
        self
    }

    pub fn with_size(mut self, size: Decimal) -> Self {
        self.size = size;
        self
    }

    /// Reject out-of-range settings. Values are never clamped.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(TriggerError::InvalidConfig(
                "instrument id must not be empty".to_string(),
            ));
        }
        if self.threshold_pct < Decimal::ZERO || self.threshold_pct > Decimal::ONE_HUNDRED {
            return Err(TriggerError::InvalidConfig(format!(
                "{}: threshold {}% outside 0-100",
                self.id, self.threshold_pct
            )));
        }
        if self.cooldown_ms > MAX_COOLDOWN_MS {
            return Err(TriggerError::InvalidConfig(format!(
                "{}: cooldown {}ms exceeds maximum {}ms",
                self.id, self.cooldown_ms, MAX_COOLDOWN_MS
            )));
        }
        if self.size <= Decimal::ZERO {
            return Err(TriggerError::InvalidConfig(format!(
                "{}: trade size must be positive, got {}",
                self.id, self.size
            )));
        }
        Ok(())
    }
}

/// Running trade counters for one instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentStats {
    pub total_trades: u64,
    pub successful_trades: u64,
    pub failed_trades: u64,
    pub total_volume: Decimal,
    /// Last metric value successfully observed
    pub last_metric: Option<Decimal>,
}

impl InstrumentStats {
    /// Percentage of submitted intents the sink accepted
    pub fn success_rate(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.successful_trades) * Decimal::ONE_HUNDRED
            / Decimal::from(self.total_trades))
        .round_dp(1)
    }
}

/// Instrument as held by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedInstrument {
    pub spec: InstrumentSpec,
    /// Inactive instruments stay registered but are neither fetched nor fired
    #[serde(default = "default_active")]
    pub active: bool,
    /// When a trade last fired (epoch ms); `None` until the first fire
    pub last_fired_ms: Option<u64>,
    pub stats: InstrumentStats,
}

fn default_active() -> bool {
    true
}

impl TrackedInstrument {
    pub fn new(spec: InstrumentSpec) -> Self {
        Self {
            spec,
            active: true,
            last_fired_ms: None,
            stats: InstrumentStats::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    /// Metric strictly above threshold. Ties do not fire.
    pub fn exceeds_threshold(&self, metric: Decimal) -> bool {
        metric > self.spec.threshold_pct
    }

    pub fn cooldown_elapsed(&self, now_ms: u64) -> bool {
        match self.last_fired_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.spec.cooldown_ms,
        }
    }

    /// Milliseconds until the cooldown lets the instrument fire again
    pub fn cooldown_remaining_ms(&self, now_ms: u64) -> u64 {
        match self.last_fired_ms {
            None => 0,
            Some(last) => self
                .spec
                .cooldown_ms
                .saturating_sub(now_ms.saturating_sub(last)),
        }
    }
}
