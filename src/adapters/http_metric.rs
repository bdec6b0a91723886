//! HTTP metric source
//!
//! Reads `GET {base_url}/volatility/{instrument}` and expects a body like
//! `{"volatility": "12.34", "timeframe": "1h", ...}`. The value may be a
//! JSON string or number and is read as a percentage.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::{FetchError, Result, TriggerError};
use crate::poller::MetricSource;

pub struct HttpMetricSource {
    http: Client,
    base_url: String,
    timeframe: Option<String>,
}

impl HttpMetricSource {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(TriggerError::InvalidConfig(
                "http metric source requires a base_url".to_string(),
            ));
        }

        let http = Client::builder()
            .user_agent("voltrigger/0.1")
            .timeout(request_timeout)
            .build()
            .map_err(|e| TriggerError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            timeframe: None,
        })
    }

    /// Ask the service for a specific window (e.g. "1h")
    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = Some(timeframe.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, instrument: &str) -> String {
        format!(
            "{}/volatility/{}",
            self.base_url,
            urlencoding::encode(instrument)
        )
    }
}

/// Pull the volatility percentage out of a response body
pub(crate) fn parse_volatility(instrument: &str, body: &Value) -> std::result::Result<Decimal, FetchError> {
    let invalid = |raw: String| FetchError::InvalidValue {
        instrument: instrument.to_string(),
        raw,
    };

    let raw = match body.get("volatility") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(invalid(other.to_string())),
        None => return Err(invalid(body.to_string())),
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| invalid(raw))
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    async fn fetch_metric(&self, instrument: &str) -> std::result::Result<Decimal, FetchError> {
        let unavailable = |reason: String| FetchError::Unavailable {
            instrument: instrument.to_string(),
            reason,
        };

        let mut req = self.http.get(self.url_for(instrument));
        if let Some(timeframe) = &self.timeframe {
            req = req.query(&[("timeframe", timeframe.as_str())]);
        }

        let resp = req.send().await.map_err(|e| unavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        let body: Value = resp.json().await.map_err(|e| unavailable(e.to_string()))?;
        let metric = parse_volatility(instrument, &body)?;
        debug!(instrument, metric = %metric, "fetched volatility");
        Ok(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_string_and_number() {
        let body = json!({ "volatility": "12.15", "timeframe": "1h" });
        assert_eq!(parse_volatility("SEI/USDT", &body).unwrap(), dec!(12.15));

        let body = json!({ "volatility": 8.5 });
        assert_eq!(parse_volatility("SEI/USDT", &body).unwrap(), dec!(8.5));
    }

    #[test]
    fn test_parse_rejects_missing_or_garbage() {
        let err = parse_volatility("SEI/USDT", &json!({ "price": "0.45" })).unwrap_err();
        assert!(matches!(err, FetchError::InvalidValue { .. }));

        let err = parse_volatility("SEI/USDT", &json!({ "volatility": "high" })).unwrap_err();
        assert!(matches!(err, FetchError::InvalidValue { .. }));

        let err = parse_volatility("SEI/USDT", &json!({ "volatility": null })).unwrap_err();
        assert!(matches!(err, FetchError::InvalidValue { .. }));
    }

    #[test]
    fn test_url_encodes_pair_symbols() {
        let source =
            HttpMetricSource::new("http://localhost:3001/api/agents/", Duration::from_secs(2))
                .unwrap();
        assert_eq!(source.base_url(), "http://localhost:3001/api/agents");
        assert_eq!(
            source.url_for("SEI/USDT"),
            "http://localhost:3001/api/agents/volatility/SEI%2FUSDT"
        );
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(HttpMetricSource::new("", Duration::from_secs(1)).is_err());
    }
}
