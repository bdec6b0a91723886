pub mod http_metric;
pub mod simulated;
pub mod sinks;

pub use http_metric::HttpMetricSource;
pub use simulated::{SimulatedVolatilitySource, StaticMetricSource};
pub use sinks::{ChannelSink, DryRunSink, JournalSink};
