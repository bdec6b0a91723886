use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trade side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    #[default]
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to trade, emitted by the poller when an instrument fires.
///
/// Immutable once built; the poller hands it to a [`TradeSink`] and never
/// looks at it again.
///
/// [`TradeSink`]: crate::poller::TradeSink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub intent_id: Uuid,
    pub instrument: String,
    pub side: TradeSide,
    pub size: Decimal,
    /// Observed metric value (volatility %) that triggered the intent
    pub metric: Decimal,
    /// Threshold in force when the intent fired
    pub threshold: Decimal,
    /// Poller clock time the intent fired at (epoch ms)
    pub timestamp_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl TradeIntent {
    pub fn new(
        instrument: impl Into<String>,
        side: TradeSide,
        size: Decimal,
        metric: Decimal,
        threshold: Decimal,
        timestamp_ms: u64,
    ) -> Self {
        let created_at = i64::try_from(timestamp_ms)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now);

        Self {
            intent_id: Uuid::new_v4(),
            instrument: instrument.into(),
            side,
            size,
            metric,
            threshold,
            timestamp_ms,
            created_at,
        }
    }

    /// How far the metric exceeded the threshold, in percentage points
    pub fn excess(&self) -> Decimal {
        self.metric - self.threshold
    }
}

/// Acknowledgement from a trade sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkReceipt {
    /// Sink-specific reference (tx hash, queue id, ...)
    pub reference: String,
    /// True when nothing was executed for real
    pub simulated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_intent_timestamp_maps_to_created_at() {
        let intent = TradeIntent::new(
            "SEI/USDT",
            TradeSide::Buy,
            dec!(0.1),
            dec!(12),
            dec!(10),
            61_000,
        );
        assert_eq!(intent.created_at.timestamp_millis(), 61_000);
        assert_eq!(intent.excess(), dec!(2));
    }

    #[test]
    fn test_side_serializes_lowercase() {
        let json = serde_json::to_string(&TradeSide::Sell).unwrap();
        assert_eq!(json, "\"sell\"");
        assert_eq!(TradeSide::Sell.to_string(), "SELL");
    }
}
