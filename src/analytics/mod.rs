//! Analytics pipeline
//!
//! Everything here runs off the response path: the dispatcher submits
//! [`AnalyticsEvent`]s to the [`AnalyticsQueue`] and dedicated workers feed
//! them to the [`AccessLogWriter`] and [`TrafficAggregator`].

pub mod access_log;
pub mod aggregator;
pub mod queue;
pub mod sink;

pub use access_log::{AccessLogWriter, RecordOutcome};
pub use aggregator::{BandwidthDelta, TrafficAggregator, TrafficPeriod};
pub use queue::{AnalyticsEvent, AnalyticsQueue};
pub use sink::{AccessLogSink, TrafficSink};
