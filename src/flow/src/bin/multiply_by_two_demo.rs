//! Push one batch through `multiply_by_two` into the log sink.

use std::sync::Arc;

use flow::model::{
    Gauge, InstrumentationScope, Metric, MetricData, Metrics, NumberDataPoint, Resource,
    ResourceMetrics, ScopeMetrics, Sum,
};
use flow::processor::{LogSink, ProcessorRegistry};
use flow::{ConsumeContext, MetricsConsumer, MULTIPLY_BY_TWO};

fn demo_batch() -> Metrics {
    Metrics::new().with_resource(
        ResourceMetrics::new(Resource::default().with_attribute("service.name", "demo")).with_scope(
            ScopeMetrics::new(InstrumentationScope::new("demo"))
                .with_metric(
                    Metric::new(
                        "bytes_sent",
                        MetricData::Sum(Sum::cumulative(vec![
                            NumberDataPoint::new(1.0),
                            NumberDataPoint::new(2.5),
                            NumberDataPoint::new(-3.0),
                        ])),
                    )
                    .with_unit("By"),
                )
                .with_metric(Metric::new(
                    "queue_depth",
                    MetricData::Gauge(Gauge {
                        data_points: vec![NumberDataPoint::new(4_i64)],
                    }),
                )),
        ),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_target(false).init();

    let registry = ProcessorRegistry::with_builtin();
    let processor = registry.create(MULTIPLY_BY_TWO, Arc::new(LogSink::new()))?;

    let mut batch = demo_batch();
    processor
        .consume_metrics(&ConsumeContext::for_pipeline("demo"), &mut batch)
        .await?;
    Ok(())
}
