//! Poller events and per-tick reports

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{SinkReceipt, TrackedInstrument, TradeIntent};
use crate::error::{FetchError, SinkError};

/// Poller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PollerState {
    Stopped,
    Running,
}

impl std::fmt::Display for PollerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollerState::Stopped => write!(f, "stopped"),
            PollerState::Running => write!(f, "running"),
        }
    }
}

/// Event broadcast to poller subscribers
#[derive(Debug, Clone)]
pub enum PollerEvent {
    Started,
    Stopped,
    /// Sink accepted the intent
    IntentSubmitted {
        intent: TradeIntent,
        receipt: SinkReceipt,
    },
    /// Sink failed; the instrument's cooldown stays consumed
    SubmissionFailed {
        intent: TradeIntent,
        error: SinkError,
    },
    /// Metric source failed for one instrument; it was skipped this tick
    FetchFailed { error: FetchError },
}

/// Outcome of a single tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Clock time the tick evaluated at (epoch ms)
    pub now_ms: u64,
    /// Instruments whose metric was fetched successfully
    pub evaluated: usize,
    /// Intents fired this tick, whatever the sink made of them
    pub fired: Vec<TradeIntent>,
    pub fetch_failures: Vec<FetchError>,
    pub sink_failures: Vec<(Uuid, SinkError)>,
    /// Metric at or below threshold
    pub below_threshold: usize,
    /// Over threshold but still inside the cooldown window
    pub cooling_down: usize,
    /// Over threshold and out of cooldown, but held back by `FirePolicy::FirstMatch`
    pub suppressed: usize,
    /// Deactivated instruments, neither fetched nor evaluated
    pub inactive: usize,
}

impl TickReport {
    pub fn fired_for(&self, instrument: &str) -> bool {
        self.fired.iter().any(|i| i.instrument == instrument)
    }
}

/// Totals across every tracked instrument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStats {
    pub total_instruments: usize,
    pub active_instruments: usize,
    pub is_monitoring: bool,
    pub total_trades: u64,
    pub successful_trades: u64,
    pub failed_trades: u64,
    /// Percent of submissions the sink accepted, one decimal place
    pub success_rate: Decimal,
    pub total_volume: Decimal,
    /// Time since `start()`; zero while stopped
    pub uptime_ms: u64,
}

impl SystemStats {
    pub fn collect(instruments: &[TrackedInstrument], is_monitoring: bool, uptime_ms: u64) -> Self {
        let mut stats = Self {
            total_instruments: instruments.len(),
            active_instruments: instruments.iter().filter(|t| t.active).count(),
            is_monitoring,
            total_trades: 0,
            successful_trades: 0,
            failed_trades: 0,
            success_rate: Decimal::ZERO,
            total_volume: Decimal::ZERO,
            uptime_ms,
        };
        for tracked in instruments {
            stats.total_trades += tracked.stats.total_trades;
            stats.successful_trades += tracked.stats.successful_trades;
            stats.failed_trades += tracked.stats.failed_trades;
            stats.total_volume += tracked.stats.total_volume;
        }
        if stats.total_trades > 0 {
            stats.success_rate = (Decimal::from(stats.successful_trades) * Decimal::ONE_HUNDRED
                / Decimal::from(stats.total_trades))
            .round_dp(1);
        }
        stats
    }
}
