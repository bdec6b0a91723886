//! Poller Configuration

use serde::{Deserialize, Serialize};

/// How many instruments may fire in a single tick.
///
/// - `per_instrument`: every instrument whose condition holds fires
///   independently.
/// - `first_match`: at most one instrument fires per tick, the first
///   qualifying one in registration order. The rest are left untouched and
///   get another chance next tick.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FirePolicy {
    #[default]
    PerInstrument,
    FirstMatch,
}

impl std::fmt::Display for FirePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FirePolicy::PerInstrument => write!(f, "per_instrument"),
            FirePolicy::FirstMatch => write!(f, "first_match"),
        }
    }
}

/// Configuration for the trade-trigger poller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Period between ticks (ms)
    pub tick_interval_ms: u64,
    /// Per-instrument metric fetch timeout (ms); a timeout counts as a fetch failure
    pub fetch_timeout_ms: u64,
    pub fire_policy: FirePolicy,
    /// Capacity of the poller event broadcast channel
    pub event_buffer: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 15_000,
            fetch_timeout_ms: 3_000,
            fire_policy: FirePolicy::PerInstrument,
            event_buffer: 256,
        }
    }
}

impl PollerConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.tick_interval_ms == 0 {
            errors.push("poller.tick_interval_ms must be positive".to_string());
        }
        if self.fetch_timeout_ms == 0 {
            errors.push("poller.fetch_timeout_ms must be positive".to_string());
        }
        if self.event_buffer == 0 {
            errors.push("poller.event_buffer must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PollerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fire_policy, FirePolicy::PerInstrument);
    }

    #[test]
    fn test_zero_periods_rejected() {
        let config = PollerConfig {
            tick_interval_ms: 0,
            fetch_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().len(), 2);
    }

    #[test]
    fn test_fire_policy_parses_snake_case() {
        let policy: FirePolicy = serde_json::from_str("\"first_match\"").unwrap();
        assert_eq!(policy, FirePolicy::FirstMatch);
    }
}
