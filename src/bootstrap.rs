//! Wire a poller from `AppConfig`

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::adapters::{
    DryRunSink, HttpMetricSource, JournalSink, SimulatedVolatilitySource, StaticMetricSource,
};
use crate::config::{AppConfig, SinkConfig, SinkKind, SourceConfig, SourceKind};
use crate::error::{Result, TriggerError};
use crate::poller::{InstrumentStore, MetricSource, TradeSink, TriggerPoller};

pub fn build_source(config: &SourceConfig, fetch_timeout_ms: u64) -> Result<Arc<dyn MetricSource>> {
    let source: Arc<dyn MetricSource> = match config.kind {
        SourceKind::Simulated => match config.seed {
            Some(seed) => Arc::new(SimulatedVolatilitySource::with_seed(
                config.max_volatility_pct,
                seed,
            )?),
            None => Arc::new(SimulatedVolatilitySource::new(config.max_volatility_pct)?),
        },
        SourceKind::Static => Arc::new(StaticMetricSource::from_values(config.static_values())),
        SourceKind::Http => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                TriggerError::InvalidConfig("source.base_url is required for the http source".to_string())
            })?;
            let mut source = HttpMetricSource::new(base_url, Duration::from_millis(fetch_timeout_ms))?;
            if let Some(timeframe) = &config.timeframe {
                source = source.with_timeframe(timeframe.clone());
            }
            Arc::new(source)
        }
    };
    Ok(source)
}

pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn TradeSink>> {
    let sink: Arc<dyn TradeSink> = match config.kind {
        SinkKind::DryRun => Arc::new(DryRunSink::new()),
        SinkKind::Journal => {
            let path = config.journal_path.as_deref().ok_or_else(|| {
                TriggerError::InvalidConfig("sink.journal_path is required for the journal sink".to_string())
            })?;
            Arc::new(JournalSink::new(path))
        }
    };
    Ok(sink)
}

/// Build a stopped poller with every configured instrument registered
pub async fn build_poller(config: &AppConfig) -> Result<TriggerPoller> {
    config
        .validate()
        .map_err(|errors| TriggerError::InvalidConfig(errors.join("; ")))?;

    let source = build_source(&config.source, config.poller.fetch_timeout_ms)?;
    let sink = build_sink(&config.sink)?;
    let poller = TriggerPoller::new(config.poller.clone(), InstrumentStore::new(), source, sink)?;

    for spec in &config.instruments {
        poller.configure_with(spec.clone()).await?;
    }

    info!(
        instruments = config.instruments.len(),
        source = %config.source.kind,
        sink = %config.sink.kind,
        "poller built"
    );
    Ok(poller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticValue;
    use crate::domain::InstrumentSpec;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_build_poller_registers_instruments() {
        let config = AppConfig::default_config();
        let poller = build_poller(&config).await.unwrap();
        let ids: Vec<String> = poller
            .instruments()
            .await
            .into_iter()
            .map(|t| t.spec.id)
            .collect();
        assert_eq!(ids, vec!["SEI/USDT", "SEI/ETH"]);
    }

    #[tokio::test]
    async fn test_build_poller_rejects_invalid_instrument() {
        let mut config = AppConfig::default_config();
        config.instruments.push(InstrumentSpec::new("BAD", dec!(-5), 1_000));
        assert!(matches!(
            build_poller(&config).await,
            Err(TriggerError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_static_source_from_config() {
        let config = SourceConfig {
            kind: SourceKind::Static,
            values: vec![StaticValue {
                instrument: "SEI/USDT".to_string(),
                volatility: dec!(15.34),
            }],
            ..Default::default()
        };
        let source = build_source(&config, 1_000).unwrap();
        assert_eq!(source.fetch_metric("SEI/USDT").await.unwrap(), dec!(15.34));
    }

    #[test]
    fn test_journal_sink_requires_path() {
        let config = SinkConfig {
            kind: SinkKind::Journal,
            journal_path: None,
        };
        assert!(build_sink(&config).is_err());
    }
}
