use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use voltrigger::{
    ChannelSink, FirePolicy, InstrumentSpec, InstrumentStore, ManualClock, PollerConfig,
    PollerEvent, PollerState, SinkError, SinkReceipt, StaticMetricSource, TradeIntent, TradeSide,
    TradeSink, TriggerError, TriggerPoller,
};

#[derive(Default)]
struct RecordingSink {
    intents: Mutex<Vec<TradeIntent>>,
}

impl RecordingSink {
    fn count(&self) -> usize {
        self.intents.lock().unwrap().len()
    }

    fn fired_at(&self, instrument: &str) -> Vec<u64> {
        self.intents
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.instrument == instrument)
            .map(|i| i.timestamp_ms)
            .collect()
    }
}

#[async_trait]
impl TradeSink for RecordingSink {
    async fn submit(&self, intent: &TradeIntent) -> Result<SinkReceipt, SinkError> {
        self.intents.lock().unwrap().push(intent.clone());
        Ok(SinkReceipt {
            reference: intent.intent_id.to_string(),
            simulated: true,
        })
    }
}

struct Harness {
    poller: TriggerPoller,
    source: Arc<StaticMetricSource>,
    sink: Arc<RecordingSink>,
    clock: Arc<ManualClock>,
}

fn harness(config: PollerConfig) -> Harness {
    let source = Arc::new(StaticMetricSource::new());
    let sink = Arc::new(RecordingSink::default());
    let clock = Arc::new(ManualClock::new(0));
    let poller = TriggerPoller::with_clock(
        config,
        InstrumentStore::new(),
        source.clone(),
        sink.clone(),
        clock.clone(),
    )
    .unwrap();
    Harness {
        poller,
        source,
        sink,
        clock,
    }
}

#[tokio::test]
async fn cooldown_scenario_fires_at_zero_and_after_window() {
    let h = harness(PollerConfig::default());
    h.poller.configure("SEI/USDT", dec!(10), 60_000).await.unwrap();

    h.source.set("SEI/USDT", dec!(12)).await;
    h.clock.set(0);
    let report = h.poller.tick().await;
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.fired[0].metric, dec!(12));
    assert_eq!(
        h.poller.instrument("SEI/USDT").await.unwrap().last_fired_ms,
        Some(0)
    );

    h.source.set("SEI/USDT", dec!(15)).await;
    h.clock.set(30_000);
    let report = h.poller.tick().await;
    assert!(report.fired.is_empty());
    assert_eq!(report.cooling_down, 1);

    h.clock.set(61_000);
    let report = h.poller.tick().await;
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.fired[0].timestamp_ms, 61_000);
    assert_eq!(
        h.poller.instrument("SEI/USDT").await.unwrap().last_fired_ms,
        Some(61_000)
    );

    assert_eq!(h.sink.fired_at("SEI/USDT"), vec![0, 61_000]);
}

#[tokio::test]
async fn metric_equal_to_threshold_never_fires() {
    let h = harness(PollerConfig::default());
    h.poller.configure("SEI/USDT", dec!(10), 0).await.unwrap();
    h.source.set("SEI/USDT", dec!(10.00)).await;

    for t in 0..5 {
        h.clock.set(t * 100_000);
        let report = h.poller.tick().await;
        assert!(report.fired.is_empty());
        assert_eq!(report.below_threshold, 1);
    }
    assert_eq!(h.sink.count(), 0);
}

#[tokio::test]
async fn invalid_threshold_is_rejected_and_not_registered() {
    let h = harness(PollerConfig::default());

    for threshold in [dec!(-5), dec!(150)] {
        let result = h.poller.configure("SEI/USDT", threshold, 60_000).await;
        assert!(matches!(result, Err(TriggerError::InvalidConfig(_))));
    }

    assert!(h.poller.instrument("SEI/USDT").await.is_none());
    assert!(h.poller.instruments().await.is_empty());
}

#[tokio::test]
async fn fetch_error_for_one_instrument_does_not_block_another() {
    let h = harness(PollerConfig::default());
    h.poller.configure("SEI/USDT", dec!(10), 60_000).await.unwrap();
    h.poller.configure("SEI/ETH", dec!(10), 60_000).await.unwrap();

    // No value for SEI/USDT: the static source reports it unavailable
    h.source.set("SEI/ETH", dec!(12.1)).await;

    let report = h.poller.tick().await;
    assert_eq!(report.fetch_failures.len(), 1);
    assert_eq!(report.fetch_failures[0].instrument(), "SEI/USDT");
    assert!(report.fired_for("SEI/ETH"));
    assert_eq!(h.sink.fired_at("SEI/ETH"), vec![0]);
}

#[tokio::test]
async fn never_fires_twice_within_cooldown_over_many_ticks() {
    let h = harness(PollerConfig::default());
    h.poller.configure("SEI/USDT", dec!(10), 45_000).await.unwrap();
    h.poller.configure("SEI/ETH", dec!(10), 20_000).await.unwrap();
    h.source.set("SEI/USDT", dec!(18.92)).await;
    h.source.set("SEI/ETH", dec!(22.45)).await;

    for t in (0..=200_000).step_by(2_500) {
        h.clock.set(t);
        h.poller.tick().await;
    }

    for (instrument, cooldown) in [("SEI/USDT", 45_000u64), ("SEI/ETH", 20_000u64)] {
        let fired = h.sink.fired_at(instrument);
        assert!(!fired.is_empty());
        for pair in fired.windows(2) {
            assert!(
                pair[1] - pair[0] >= cooldown,
                "{} fired at {} and {}",
                instrument,
                pair[0],
                pair[1]
            );
        }
    }
    assert_eq!(
        h.sink.fired_at("SEI/USDT"),
        vec![0, 45_000, 90_000, 135_000, 180_000]
    );
}

#[tokio::test]
async fn first_match_policy_fires_one_per_tick() {
    let h = harness(PollerConfig {
        fire_policy: FirePolicy::FirstMatch,
        ..Default::default()
    });
    h.poller.configure("SEI/USDT", dec!(10), 60_000).await.unwrap();
    h.poller.configure("SEI/ETH", dec!(10), 60_000).await.unwrap();
    h.source.set("SEI/USDT", dec!(15)).await;
    h.source.set("SEI/ETH", dec!(15)).await;

    let report = h.poller.tick().await;
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.suppressed, 1);

    // Suppressed instrument keeps its cooldown untouched
    assert_eq!(h.poller.instrument("SEI/ETH").await.unwrap().last_fired_ms, None);
}

#[tokio::test(start_paused = true)]
async fn stop_prevents_further_intents() {
    let h = harness(PollerConfig {
        tick_interval_ms: 1_000,
        ..Default::default()
    });
    h.poller.configure("SEI/USDT", dec!(10), 0).await.unwrap();
    h.source.set("SEI/USDT", dec!(11)).await;

    h.poller.start().unwrap();
    assert_eq!(h.poller.state(), PollerState::Running);

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    let before = h.sink.count();
    assert_eq!(before, 3);

    assert!(h.poller.stop().await);
    assert_eq!(h.poller.state(), PollerState::Stopped);

    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(h.sink.count(), before);

    // stop is idempotent
    assert!(!h.poller.stop().await);
}

#[tokio::test(start_paused = true)]
async fn lifecycle_events_are_broadcast() {
    let h = harness(PollerConfig::default());
    let mut events = h.poller.subscribe();

    h.poller.start().unwrap();
    h.poller.stop().await;

    assert!(matches!(events.recv().await.unwrap(), PollerEvent::Started));
    assert!(matches!(events.recv().await.unwrap(), PollerEvent::Stopped));
}

#[tokio::test]
async fn channel_sink_delivers_intent_to_executor() {
    let source = Arc::new(StaticMetricSource::new());
    let (sink, mut executor_rx) = ChannelSink::new(8);
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let poller = TriggerPoller::with_clock(
        PollerConfig::default(),
        InstrumentStore::new(),
        source.clone(),
        Arc::new(sink),
        clock,
    )
    .unwrap();

    poller
        .configure_with(
            InstrumentSpec::new("0x2222222222222222222222222222222222222222", dec!(5), 60_000)
                .with_side(TradeSide::Sell)
                .with_size(dec!(0.5)),
        )
        .await
        .unwrap();
    source
        .set("0x2222222222222222222222222222222222222222", dec!(6.78))
        .await;

    poller.tick().await;

    let intent = executor_rx.recv().await.unwrap();
    assert_eq!(intent.side, TradeSide::Sell);
    assert_eq!(intent.size, dec!(0.5));
    assert_eq!(intent.metric, dec!(6.78));
    assert_eq!(intent.threshold, dec!(5));
    assert_eq!(intent.timestamp_ms, 1_700_000_000_000);

    let stats = poller
        .stats("0x2222222222222222222222222222222222222222")
        .await
        .unwrap();
    assert_eq!(stats.successful_trades, 1);
    assert_eq!(stats.total_volume, dec!(0.5));
    assert_eq!(stats.last_metric, Some(dec!(6.78)));
}

#[tokio::test]
async fn closed_executor_counts_as_failure_and_consumes_cooldown() {
    let source = Arc::new(StaticMetricSource::new());
    let (sink, executor_rx) = ChannelSink::new(8);
    drop(executor_rx);
    let clock = Arc::new(ManualClock::new(0));
    let poller = TriggerPoller::with_clock(
        PollerConfig::default(),
        InstrumentStore::new(),
        source.clone(),
        Arc::new(sink),
        clock.clone(),
    )
    .unwrap();
    poller.configure("SEI/USDT", dec!(10), 60_000).await.unwrap();
    source.set("SEI/USDT", dec!(16.23)).await;

    let report = poller.tick().await;
    assert_eq!(report.sink_failures.len(), 1);
    assert_eq!(report.sink_failures[0].1, SinkError::Closed);

    clock.set(59_999);
    assert!(poller.tick().await.fired.is_empty());

    let stats = poller.stats("SEI/USDT").await.unwrap();
    assert_eq!(stats.failed_trades, 1);
    assert_eq!(stats.success_rate(), Decimal::ZERO);
}
