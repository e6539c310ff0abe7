pub mod metrics;

pub use metrics::{
    AggregationTemporality, Attributes, Gauge, Histogram, HistogramDataPoint,
    InstrumentationScope, Metric, MetricData, MetricKind, Metrics, NumberDataPoint, NumberValue,
    Resource, ResourceMetrics, ScopeMetrics, Sum,
};
