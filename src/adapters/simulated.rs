//! In-process metric sources
//!
//! - `SimulatedVolatilitySource`: uniform random volatility, for demos and
//!   dry runs. Randomness lives here, never in the poller.
//! - `StaticMetricSource`: fixed or externally cached values

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{FetchError, Result, TriggerError};
use crate::poller::MetricSource;

/// Random volatility in `[0, max_pct)`, truncated to two decimals
pub struct SimulatedVolatilitySource {
    max_pct: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedVolatilitySource {
    pub fn new(max_pct: f64) -> Result<Self> {
        Self::build(max_pct, StdRng::from_entropy())
    }

    /// Reproducible sequence for replays
    pub fn with_seed(max_pct: f64, seed: u64) -> Result<Self> {
        Self::build(max_pct, StdRng::seed_from_u64(seed))
    }

    fn build(max_pct: f64, rng: StdRng) -> Result<Self> {
        if !max_pct.is_finite() || max_pct <= 0.0 || max_pct > 100.0 {
            return Err(TriggerError::InvalidConfig(format!(
                "simulated max volatility must be in (0, 100], got {}",
                max_pct
            )));
        }
        Ok(Self {
            max_pct,
            rng: Mutex::new(rng),
        })
    }
}

#[async_trait]
impl MetricSource for SimulatedVolatilitySource {
    async fn fetch_metric(&self, instrument: &str) -> std::result::Result<Decimal, FetchError> {
        let sample = {
            let mut rng = self.rng.lock().map_err(|_| FetchError::Unavailable {
                instrument: instrument.to_string(),
                reason: "rng lock poisoned".to_string(),
            })?;
            rng.gen_range(0.0..self.max_pct)
        };

        let metric = Decimal::from_f64(sample)
            // Truncate so a sample just under max_pct never reaches it
            .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::ToZero))
            .ok_or_else(|| FetchError::InvalidValue {
                instrument: instrument.to_string(),
                raw: sample.to_string(),
            })?;

        debug!(instrument, metric = %metric, "simulated volatility");
        Ok(metric)
    }
}

/// Metric values set from outside (config table, cache refresher, tests)
#[derive(Debug, Default)]
pub struct StaticMetricSource {
    values: RwLock<HashMap<String, Decimal>>,
}

impl StaticMetricSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: HashMap<String, Decimal>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub async fn set(&self, instrument: &str, value: Decimal) {
        self.values.write().await.insert(instrument.to_string(), value);
    }

    /// Drop the value; later fetches fail as unavailable
    pub async fn clear(&self, instrument: &str) {
        self.values.write().await.remove(instrument);
    }
}

#[async_trait]
impl MetricSource for StaticMetricSource {
    async fn fetch_metric(&self, instrument: &str) -> std::result::Result<Decimal, FetchError> {
        self.values
            .read()
            .await
            .get(instrument)
            .copied()
            .ok_or_else(|| FetchError::Unavailable {
                instrument: instrument.to_string(),
                reason: "no value cached".to_string(),
            })
    }
}
