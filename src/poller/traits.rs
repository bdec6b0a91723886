//! Collaborator seams for the poller

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{SinkReceipt, TradeIntent};
use crate::error::{FetchError, SinkError};

/// Where the poller reads the current metric (volatility %) from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch_metric(&self, instrument: &str) -> Result<Decimal, FetchError>;
}

/// Where fired trade intents go.
///
/// The poller does not care whether the sink executes on-chain, simulates,
/// or only logs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeSink: Send + Sync {
    async fn submit(&self, intent: &TradeIntent) -> Result<SinkReceipt, SinkError>;
}
