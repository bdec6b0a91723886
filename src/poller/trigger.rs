//! Trade-Trigger Poller
//!
//! On a fixed period, fetches the metric for every tracked instrument and
//! fires a trade intent when the metric is strictly above the instrument's
//! threshold and its cooldown has elapsed.
//!
//! Failure handling:
//! - a failed or timed-out fetch skips that instrument for the tick only
//! - a failed submission is logged and counted; the cooldown stays consumed
//!   so a transient sink failure cannot cause duplicate submissions

use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::{FirePolicy, PollerConfig};
use super::events::{PollerEvent, PollerState, SystemStats, TickReport};
use super::store::InstrumentStore;
use super::traits::{MetricSource, TradeSink};
use crate::clock::{Clock, SystemClock};
use crate::domain::{InstrumentSpec, InstrumentStats, TrackedInstrument, TradeIntent};
use crate::error::{FetchError, Result, TriggerError};

/// Handle to the scheduler task while running
struct RunHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
    started_at_ms: u64,
}

struct PollerInner {
    config: PollerConfig,
    store: InstrumentStore,
    source: Arc<dyn MetricSource>,
    sink: Arc<dyn TradeSink>,
    clock: Arc<dyn Clock>,
    event_tx: broadcast::Sender<PollerEvent>,
    state_tx: watch::Sender<PollerState>,
}

pub struct TriggerPoller {
    inner: Arc<PollerInner>,
    run: Mutex<Option<RunHandle>>,
}

impl TriggerPoller {
    /// Create a poller driven by the wall clock
    pub fn new(
        config: PollerConfig,
        store: InstrumentStore,
        source: Arc<dyn MetricSource>,
        sink: Arc<dyn TradeSink>,
    ) -> Result<Self> {
        Self::with_clock(config, store, source, sink, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: PollerConfig,
        store: InstrumentStore,
        source: Arc<dyn MetricSource>,
        sink: Arc<dyn TradeSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| TriggerError::InvalidConfig(errors.join("; ")))?;

        let (event_tx, _) = broadcast::channel(config.event_buffer);
        let (state_tx, _) = watch::channel(PollerState::Stopped);

        Ok(Self {
            inner: Arc::new(PollerInner {
                config,
                store,
                source,
                sink,
                clock,
                event_tx,
                state_tx,
            }),
            run: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &InstrumentStore {
        &self.inner.store
    }

    /// Subscribe to poller events
    pub fn subscribe(&self) -> broadcast::Receiver<PollerEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn state(&self) -> PollerState {
        *self.inner.state_tx.borrow()
    }

    pub fn state_receiver(&self) -> watch::Receiver<PollerState> {
        self.inner.state_tx.subscribe()
    }

    /// Register or update an instrument with default side and size.
    ///
    /// An existing instrument keeps its side, size, cooldown timestamp and
    /// stats. Out-of-range values fail with `InvalidConfig` and leave the
    /// store untouched.
    pub async fn configure(
        &self,
        instrument: &str,
        threshold_pct: Decimal,
        cooldown_ms: u64,
    ) -> Result<()> {
        self.inner
            .store
            .configure(instrument, threshold_pct, cooldown_ms)
            .await
            .map(|_| ())
    }

    pub async fn configure_with(&self, spec: InstrumentSpec) -> Result<()> {
        self.inner.store.upsert(spec).await.map(|_| ())
    }

    pub async fn instrument(&self, id: &str) -> Option<TrackedInstrument> {
        self.inner.store.get(id).await
    }

    pub async fn instruments(&self) -> Vec<TrackedInstrument> {
        self.inner.store.snapshot().await
    }

    pub async fn stats(&self, id: &str) -> Option<InstrumentStats> {
        self.inner.store.stats(id).await
    }

    /// Stop fetching and firing for an instrument. Its cooldown and stats
    /// are kept.
    pub async fn deactivate(&self, id: &str) -> Result<()> {
        if self.inner.store.set_active(id, false).await? {
            info!(instrument = %id, "instrument deactivated");
        }
        Ok(())
    }

    pub async fn reactivate(&self, id: &str) -> Result<()> {
        if self.inner.store.set_active(id, true).await? {
            info!(instrument = %id, "instrument reactivated");
        }
        Ok(())
    }

    /// Totals across all instruments, with uptime since `start()`
    pub async fn system_stats(&self) -> SystemStats {
        let started_at_ms = self.run_lock().as_ref().map(|h| h.started_at_ms);
        let uptime_ms = started_at_ms
            .map(|started| self.inner.clock.now_ms().saturating_sub(started))
            .unwrap_or(0);
        let instruments = self.inner.store.snapshot().await;
        SystemStats::collect(&instruments, started_at_ms.is_some(), uptime_ms)
    }

    /// Poisoning is ignored; the slot is only ever swapped whole.
    fn run_lock(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.run.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Evaluate every instrument once
    pub async fn tick(&self) -> TickReport {
        self.inner.tick().await
    }

    /// Start ticking every `tick_interval_ms`. The first tick runs one
    /// period after start.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut run = self.run_lock();
        if run.is_some() {
            return Err(TriggerError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(Arc::clone(&self.inner).run(stop_rx));
        *run = Some(RunHandle {
            stop_tx,
            join,
            started_at_ms: self.inner.clock.now_ms(),
        });
        drop(run);

        self.inner.state_tx.send_replace(PollerState::Running);
        self.inner.emit(PollerEvent::Started);
        info!(
            tick_interval_ms = self.inner.config.tick_interval_ms,
            fire_policy = %self.inner.config.fire_policy,
            "trade-trigger poller started"
        );
        Ok(())
    }

    /// Stop ticking. A tick already in flight runs to completion; no tick
    /// starts after this returns.
    ///
    /// Returns `false` if the poller was not running.
    pub async fn stop(&self) -> bool {
        let handle = self.run_lock().take();
        let Some(handle) = handle else {
            debug!("stop requested but poller not running");
            return false;
        };

        let _ = handle.stop_tx.send(true);
        if let Err(e) = handle.join.await {
            warn!(error = %e, "poller task ended abnormally");
        }

        self.inner.state_tx.send_replace(PollerState::Stopped);
        self.inner.emit(PollerEvent::Stopped);
        info!("trade-trigger poller stopped");
        true
    }
}

impl PollerInner {
    fn emit(&self, event: PollerEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    async fn run(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let period = Duration::from_millis(self.config.tick_interval_ms);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        // Don't burst-fire missed ticks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = stop_rx.changed() => break,

                _ = ticker.tick() => {}
            }

            let report = self.tick().await;
            debug!(
                evaluated = report.evaluated,
                fired = report.fired.len(),
                fetch_failures = report.fetch_failures.len(),
                cooling_down = report.cooling_down,
                "tick complete"
            );
        }

        debug!("poller loop exited");
    }

    async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let ids = self.store.active_ids().await;
        let results = join_all(ids.iter().map(|id| self.fetch_with_timeout(id))).await;

        let mut metrics: HashMap<String, Decimal> = HashMap::with_capacity(ids.len());
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(metric) => {
                    metrics.insert(id, metric);
                }
                Err(e) => {
                    warn!(instrument = %id, error = %e, "metric fetch failed, skipping this tick");
                    self.emit(PollerEvent::FetchFailed { error: e.clone() });
                    report.fetch_failures.push(e);
                }
            }
        }
        report.evaluated = metrics.len();

        let now_ms = self.clock.now_ms();
        report.now_ms = now_ms;
        let policy = self.config.fire_policy;

        let fired = self
            .store
            .update(|instruments| {
                let mut fired: Vec<TradeIntent> = Vec::new();
                for tracked in instruments.iter_mut() {
                    if !tracked.active {
                        report.inactive += 1;
                        continue;
                    }
                    let Some(&metric) = metrics.get(tracked.id()) else {
                        continue;
                    };
                    tracked.stats.last_metric = Some(metric);

                    if !tracked.exceeds_threshold(metric) {
                        report.below_threshold += 1;
                        continue;
                    }
                    if !tracked.cooldown_elapsed(now_ms) {
                        debug!(
                            instrument = %tracked.id(),
                            metric = %metric,
                            remaining_ms = tracked.cooldown_remaining_ms(now_ms),
                            "over threshold but cooling down"
                        );
                        report.cooling_down += 1;
                        continue;
                    }
                    if policy == FirePolicy::FirstMatch && !fired.is_empty() {
                        report.suppressed += 1;
                        continue;
                    }

                    tracked.last_fired_ms = Some(now_ms);
                    fired.push(TradeIntent::new(
                        tracked.id(),
                        tracked.spec.side,
                        tracked.spec.size,
                        metric,
                        tracked.spec.threshold_pct,
                        now_ms,
                    ));
                }
                fired
            })
            .await;

        for intent in &fired {
            info!(
                instrument = %intent.instrument,
                side = %intent.side,
                size = %intent.size,
                metric = %intent.metric,
                threshold = %intent.threshold,
                "trade intent fired"
            );

            match self.sink.submit(intent).await {
                Ok(receipt) => {
                    self.store
                        .record_submission(&intent.instrument, intent.size, true)
                        .await;
                    info!(
                        instrument = %intent.instrument,
                        intent_id = %intent.intent_id,
                        reference = %receipt.reference,
                        simulated = receipt.simulated,
                        "trade intent submitted"
                    );
                    self.emit(PollerEvent::IntentSubmitted {
                        intent: intent.clone(),
                        receipt,
                    });
                }
                Err(e) => {
                    self.store
                        .record_submission(&intent.instrument, intent.size, false)
                        .await;
                    error!(
                        instrument = %intent.instrument,
                        intent_id = %intent.intent_id,
                        error = %e,
                        "trade submission failed, cooldown stays consumed"
                    );
                    report.sink_failures.push((intent.intent_id, e.clone()));
                    self.emit(PollerEvent::SubmissionFailed {
                        intent: intent.clone(),
                        error: e,
                    });
                }
            }
        }

        report.fired = fired;
        report
    }

    async fn fetch_with_timeout(&self, instrument: &str) -> std::result::Result<Decimal, FetchError> {
        let timeout = Duration::from_millis(self.config.fetch_timeout_ms);
        match tokio::time::timeout(timeout, self.source.fetch_metric(instrument)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                instrument: instrument.to_string(),
                elapsed_ms: self.config.fetch_timeout_ms,
            }),
        }
    }
}
