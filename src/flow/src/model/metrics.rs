//! In-memory metric batch.
//!
//! A [`Metrics`] batch nests resource groups, instrumentation scope groups,
//! metrics and finally data points. Stages receive the batch by exclusive
//! borrow and may rewrite leaf values, never the shape of the tree.

use std::collections::BTreeMap;

/// Attributes attached to resources and data points.
pub type Attributes = BTreeMap<String, String>;

/// A batch of metrics grouped by the resource that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    /// Resource groups in the order they were received.
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl Metrics {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource group.
    pub fn with_resource(mut self, resource_metrics: ResourceMetrics) -> Self {
        self.resource_metrics.push(resource_metrics);
        self
    }

    /// True when the batch has no resource groups.
    pub fn is_empty(&self) -> bool {
        self.resource_metrics.is_empty()
    }

    /// Number of metrics across every resource and scope group.
    pub fn metric_count(&self) -> usize {
        self.metrics().count()
    }

    /// Total number of data points across every metric kind.
    pub fn data_point_count(&self) -> usize {
        self.metrics().map(Metric::data_point_count).sum()
    }

    /// Iterate over every metric in traversal order.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.resource_metrics
            .iter()
            .flat_map(|rm| rm.scope_metrics.iter())
            .flat_map(|sm| sm.metrics.iter())
    }

    /// Mutable counterpart of [`Metrics::metrics`].
    pub fn metrics_mut(&mut self) -> impl Iterator<Item = &mut Metric> {
        self.resource_metrics
            .iter_mut()
            .flat_map(|rm| rm.scope_metrics.iter_mut())
            .flat_map(|sm| sm.metrics.iter_mut())
    }

    /// First metric named `name` in traversal order.
    pub fn find_metric(&self, name: &str) -> Option<&Metric> {
        self.metrics().find(|metric| metric.name == name)
    }
}

/// Entity producing the metrics, described by its attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    pub attributes: Attributes,
}

impl Resource {
    /// Set a resource attribute, replacing any previous value for `key`.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Metrics produced by one resource, grouped by instrumentation scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceMetrics {
    pub resource: Resource,
    pub scope_metrics: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            scope_metrics: Vec::new(),
        }
    }

    /// Append an instrumentation scope group.
    pub fn with_scope(mut self, scope_metrics: ScopeMetrics) -> Self {
        self.scope_metrics.push(scope_metrics);
        self
    }
}

/// Library or component that recorded the metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentationScope {
    pub name: String,
    pub version: Option<String>,
}

impl InstrumentationScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }
}

/// Metrics recorded under one instrumentation scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeMetrics {
    pub scope: InstrumentationScope,
    pub metrics: Vec<Metric>,
}

impl ScopeMetrics {
    pub fn new(scope: InstrumentationScope) -> Self {
        Self {
            scope,
            metrics: Vec::new(),
        }
    }

    /// Append a metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }
}

/// A named metric and its data points.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub data: MetricData,
}

impl Metric {
    /// Metric with empty description and unit.
    pub fn new(name: impl Into<String>, data: MetricData) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            unit: String::new(),
            data,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Number of data points regardless of kind.
    pub fn data_point_count(&self) -> usize {
        match &self.data {
            MetricData::Gauge(gauge) => gauge.data_points.len(),
            MetricData::Sum(sum) => sum.data_points.len(),
            MetricData::Histogram(histogram) => histogram.data_points.len(),
        }
    }

    /// Number data points of gauge and sum metrics; histograms have none.
    pub fn number_data_points(&self) -> &[NumberDataPoint] {
        match &self.data {
            MetricData::Gauge(gauge) => &gauge.data_points,
            MetricData::Sum(sum) => &sum.data_points,
            MetricData::Histogram(_) => &[],
        }
    }
}

/// Data of a metric; the variant is the metric kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricData {
    Gauge(Gauge),
    Sum(Sum),
    Histogram(Histogram),
}

impl MetricData {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricData::Gauge(_) => MetricKind::Gauge,
            MetricData::Sum(_) => MetricKind::Sum,
            MetricData::Histogram(_) => MetricKind::Histogram,
        }
    }
}

/// Kind of a metric without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Sum,
    Histogram,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Sum => "sum",
            MetricKind::Histogram => "histogram",
        }
    }
}

/// Whether sum and histogram points restart each interval or accumulate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregationTemporality {
    Delta,
    #[default]
    Cumulative,
}

/// Instantaneous values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gauge {
    pub data_points: Vec<NumberDataPoint>,
}

/// Additive values, either cumulative or delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sum {
    pub data_points: Vec<NumberDataPoint>,
    pub temporality: AggregationTemporality,
    pub is_monotonic: bool,
}

impl Sum {
    /// Monotonic cumulative sum over `data_points`.
    pub fn cumulative(data_points: Vec<NumberDataPoint>) -> Self {
        Self {
            data_points,
            temporality: AggregationTemporality::Cumulative,
            is_monotonic: true,
        }
    }
}

/// Bucketed distributions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    pub data_points: Vec<HistogramDataPoint>,
    pub temporality: AggregationTemporality,
}

/// Value of a gauge or sum data point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Int(i64),
    Double(f64),
}

impl NumberValue {
    /// Value widened to `f64`; large integers lose precision.
    pub fn as_f64(&self) -> f64 {
        match *self {
            NumberValue::Int(v) => v as f64,
            NumberValue::Double(v) => v,
        }
    }
}

impl From<i64> for NumberValue {
    fn from(value: i64) -> Self {
        NumberValue::Int(value)
    }
}

impl From<f64> for NumberValue {
    fn from(value: f64) -> Self {
        NumberValue::Double(value)
    }
}

/// One timestamped gauge or sum sample.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberDataPoint {
    pub attributes: Attributes,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub value: NumberValue,
}

impl NumberDataPoint {
    /// Point with no attributes and zero timestamps.
    pub fn new(value: impl Into<NumberValue>) -> Self {
        Self {
            attributes: Attributes::new(),
            start_time_unix_nano: 0,
            time_unix_nano: 0,
            value: value.into(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// One timestamped histogram sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramDataPoint {
    pub attributes: Attributes,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub count: u64,
    pub sum: Option<f64>,
    pub bucket_counts: Vec<u64>,
    pub explicit_bounds: Vec<f64>,
}
