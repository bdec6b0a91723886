//! Trade-trigger poller
//!
//! - `config`: tick period, fetch timeout and fire policy
//! - `store`: explicit instrument store owned by the host
//! - `traits`: metric source and trade sink seams
//! - `trigger`: the poller itself

pub mod config;
pub mod events;
pub mod store;
pub mod traits;
pub mod trigger;

pub use config::{FirePolicy, PollerConfig};
pub use events::{PollerEvent, PollerState, SystemStats, TickReport};
pub use store::InstrumentStore;
pub use traits::{MetricSource, TradeSink};
pub use trigger::TriggerPoller;
