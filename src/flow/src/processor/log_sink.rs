//! Terminal consumer that logs each metric it receives.

use async_trait::async_trait;

use crate::consumer::{ConsumeContext, ConsumerError, MetricsConsumer};
use crate::model::{MetricData, Metrics};

/// Sink logging one line per metric; it never fails.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsConsumer for LogSink {
    async fn consume_metrics(
        &self,
        ctx: &ConsumeContext,
        metrics: &mut Metrics,
    ) -> Result<(), ConsumerError> {
        let pipeline = ctx.pipeline().unwrap_or("-");
        for metric in metrics.metrics() {
            let values: Vec<String> = match &metric.data {
                MetricData::Histogram(histogram) => histogram
                    .data_points
                    .iter()
                    .map(|point| format!("count={}", point.count))
                    .collect(),
                _ => metric
                    .number_data_points()
                    .iter()
                    .map(|point| point.value.as_f64().to_string())
                    .collect(),
            };
            tracing::info!(
                pipeline,
                metric = %metric.name,
                kind = metric.data.kind().as_str(),
                unit = %metric.unit,
                values = %values.join(","),
                "metric received"
            );
        }
        Ok(())
    }
}
