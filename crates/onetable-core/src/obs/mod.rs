//! Observability: metrics events flow through an injected [`MetricsSink`].
//! Logging uses `tracing` directly at the call sites.

mod sink;

pub use sink::{CounterSink, MetricsEvent, MetricsReport, MetricsSink, NoopSink};
