pub mod adapters;
pub mod bootstrap;
pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod poller;

pub use adapters::{
    ChannelSink, DryRunSink, HttpMetricSource, JournalSink, SimulatedVolatilitySource,
    StaticMetricSource,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use domain::{InstrumentSpec, InstrumentStats, SinkReceipt, TrackedInstrument, TradeIntent, TradeSide};
pub use error::{FetchError, Result, SinkError, TriggerError};
pub use poller::{
    FirePolicy, InstrumentStore, MetricSource, PollerConfig, PollerEvent, PollerState, SystemStats,
    TickReport, TradeSink, TriggerPoller,
};
