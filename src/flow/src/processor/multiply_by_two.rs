//! `multiply_by_two` processor.
//!
//! Doubles the value of every sum data point in the batch, then hands the
//! batch to the next consumer. Gauge and histogram points pass through
//! untouched.

use std::sync::Arc;

use async_trait::async_trait;

use crate::consumer::{Capabilities, ConsumeContext, ConsumerError, MetricsConsumer};
use crate::model::{MetricData, Metrics, NumberValue};

/// Type name the processor is registered under.
pub const MULTIPLY_BY_TWO: &str = "multiply_by_two";

/// Processor doubling sum data points before forwarding.
/// 
/// The batch is rewritten in place, so the processor reports
/// `mutates_data` in its capabilities.
pub struct MultiplyByTwoProcessor {
    next: Arc<dyn MetricsConsumer>,
}

impl MultiplyByTwoProcessor {
    /// Create a processor forwarding to `next`.
    pub fn new(next: Arc<dyn MetricsConsumer>) -> Self {
        Self { next }
    }

    /// Double every sum data point in place and return how many were touched.
    ///
    /// Traversal runs resource, scope, metric, data point, each in index order.
    pub fn double_sums(metrics: &mut Metrics) -> usize {
        let mut doubled = 0;
        for resource_metrics in &mut metrics.resource_metrics {
            for scope_metrics in &mut resource_metrics.scope_metrics {
                for metric in &mut scope_metrics.metrics {
                    let MetricData::Sum(sum) = &mut metric.data else {
                        continue;
                    };
                    for data_point in &mut sum.data_points {
                        data_point.value = double(data_point.value);
                        doubled += 1;
                    }
                }
            }
        }
        doubled
    }
}

fn double(value: NumberValue) -> NumberValue {
    match value {
        NumberValue::Int(v) => NumberValue::Int(v.saturating_mul(2)),
        NumberValue::Double(v) => NumberValue::Double(v * 2.0),
    }
}

#[async_trait]
impl MetricsConsumer for MultiplyByTwoProcessor {
    fn capabilities(&self) -> Capabilities {
        Capabilities { mutates_data: true }
    }

    async fn consume_metrics(
        &self,
        ctx: &ConsumeContext,
        metrics: &mut Metrics,
    ) -> Result<(), ConsumerError> {
        let doubled = Self::double_sums(metrics);
        tracing::debug!(
            processor = MULTIPLY_BY_TWO,
            pipeline = ctx.pipeline().unwrap_or("-"),
            doubled,
            "doubled sum data points"
        );
        self.next.consume_metrics(ctx, metrics).await
    }
}
