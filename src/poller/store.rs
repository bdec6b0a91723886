//! Instrument store
//!
//! Holds the tracked instruments in registration order. The store is a
//! cheap handle; clones share the same instruments, so the host can keep one
//! for inspection while the poller owns another.

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{InstrumentSpec, InstrumentStats, TrackedInstrument};
use crate::error::{Result, TriggerError};

#[derive(Debug, Clone, Default)]
pub struct InstrumentStore {
    instruments: Arc<RwLock<Vec<TrackedInstrument>>>,
}

impl InstrumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update an instrument.
    ///
    /// Returns `true` when the instrument is new. Updates replace the
    /// settings but keep `last_fired_ms`, stats and the active flag.
    pub async fn upsert(&self, spec: InstrumentSpec) -> Result<bool> {
        spec.validate()?;

        let mut instruments = self.instruments.write().await;
        Ok(Self::apply(&mut instruments, spec))
    }

    /// Set threshold and cooldown, keeping an existing instrument's side and
    /// size. The merge and the write happen under one lock.
    pub async fn configure(&self, id: &str, threshold_pct: Decimal, cooldown_ms: u64) -> Result<bool> {
        let mut instruments = self.instruments.write().await;

        let mut spec = InstrumentSpec::new(id, threshold_pct, cooldown_ms);
        if let Some(existing) = instruments.iter().find(|t| t.id() == id) {
            spec.side = existing.spec.side;
            spec.size = existing.spec.size;
        }
        spec.validate()?;

        Ok(Self::apply(&mut instruments, spec))
    }

    fn apply(instruments: &mut Vec<TrackedInstrument>, spec: InstrumentSpec) -> bool {
        if let Some(existing) = instruments.iter_mut().find(|t| t.id() == spec.id) {
            debug!(
                instrument = %spec.id,
                threshold = %spec.threshold_pct,
                cooldown_ms = spec.cooldown_ms,
                "instrument updated"
            );
            existing.spec = spec;
            return false;
        }

        info!(
            instrument = %spec.id,
            threshold = %spec.threshold_pct,
            cooldown_ms = spec.cooldown_ms,
            side = %spec.side,
            "instrument registered"
        );
        instruments.push(TrackedInstrument::new(spec));
        true
    }

    /// Pause or resume an instrument without forgetting its cooldown or stats.
    ///
    /// Returns `true` if the flag changed.
    pub async fn set_active(&self, id: &str, active: bool) -> Result<bool> {
        let mut instruments = self.instruments.write().await;
        let tracked = instruments
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| TriggerError::UnknownInstrument(id.to_string()))?;

        let changed = tracked.active != active;
        tracked.active = active;
        Ok(changed)
    }

    pub async fn get(&self, id: &str) -> Option<TrackedInstrument> {
        let instruments = self.instruments.read().await;
        instruments.iter().find(|t| t.id() == id).cloned()
    }

    /// All instruments, in registration order
    pub async fn snapshot(&self) -> Vec<TrackedInstrument> {
        self.instruments.read().await.clone()
    }

    pub async fn ids(&self) -> Vec<String> {
        let instruments = self.instruments.read().await;
        instruments.iter().map(|t| t.id().to_string()).collect()
    }

    /// Ids of active instruments, in registration order
    pub async fn active_ids(&self) -> Vec<String> {
        let instruments = self.instruments.read().await;
        instruments
            .iter()
            .filter(|t| t.active)
            .map(|t| t.id().to_string())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.instruments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.instruments.read().await.is_empty()
    }

    pub async fn stats(&self, id: &str) -> Option<InstrumentStats> {
        self.get(id).await.map(|t| t.stats)
    }

    /// Run `f` with exclusive access to the instruments.
    ///
    /// Cooldown check-and-set happens inside one call so two overlapping
    /// ticks cannot both fire the same instrument.
    pub(crate) async fn update<R>(&self, f: impl FnOnce(&mut [TrackedInstrument]) -> R) -> R {
        let mut instruments = self.instruments.write().await;
        f(instruments.as_mut_slice())
    }

    /// Record the sink outcome for a fired intent
    pub(crate) async fn record_submission(&self, id: &str, size: Decimal, accepted: bool) {
        let mut instruments = self.instruments.write().await;
        if let Some(tracked) = instruments.iter_mut().find(|t| t.id() == id) {
            let stats = &mut tracked.stats;
            stats.total_trades += 1;
            if accepted {
                stats.successful_trades += 1;
                stats.total_volume += size;
            } else {
                stats.failed_trades += 1;
            }
        }
    }
}
