//! Behaviour of the `multiply_by_two` processor against a recording consumer.

use async_trait::async_trait;
use flow::model::{
    Gauge, Histogram, HistogramDataPoint, InstrumentationScope, Metric, MetricData, Metrics,
    NumberDataPoint, NumberValue, Resource, ResourceMetrics, ScopeMetrics, Sum,
};
use flow::{ConsumeContext, ConsumerError, MetricsConsumer, MultiplyByTwoProcessor};
use std::sync::{Arc, Mutex};

/// Downstream consumer that records what it saw and answers with a fixed result.
struct RecordingConsumer {
    seen: Mutex<Vec<Metrics>>,
    result: Result<(), ConsumerError>,
}

impl RecordingConsumer {
    fn ok() -> Arc<Self> {
        Self::answering(Ok(()))
    }

    fn answering(result: Result<(), ConsumerError>) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            result,
        })
    }

    fn seen(&self) -> Vec<Metrics> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsConsumer for RecordingConsumer {
    async fn consume_metrics(
        &self,
        _ctx: &ConsumeContext,
        metrics: &mut Metrics,
    ) -> Result<(), ConsumerError> {
        self.seen.lock().unwrap().push(metrics.clone());
        self.result.clone()
    }
}

fn sum_batch(values: &[f64]) -> Metrics {
    let points = values.iter().map(|v| NumberDataPoint::new(*v)).collect();
    Metrics::new().with_resource(
        ResourceMetrics::new(Resource::default().with_attribute("host.name", "test")).with_scope(
            ScopeMetrics::new(InstrumentationScope::new("test")).with_metric(Metric::new(
                "bytes_sent",
                MetricData::Sum(Sum::cumulative(points)),
            )),
        ),
    )
}

fn sum_values(metrics: &Metrics, name: &str) -> Vec<NumberValue> {
    metrics
        .find_metric(name)
        .expect("metric present")
        .number_data_points()
        .iter()
        .map(|point| point.value)
        .collect()
}

fn doubles(values: &[f64]) -> Vec<NumberValue> {
    values.iter().map(|v| NumberValue::Double(*v)).collect()
}

#[tokio::test]
async fn doubles_sum_points_and_keeps_shape() {
    struct TestCase {
        name: &'static str,
        input: Vec<f64>,
        expected: Vec<f64>,
    }

    let cases = vec![
        TestCase {
            name: "mixed signs",
            input: vec![1.0, 2.5, -3.0],
            expected: vec![2.0, 5.0, -6.0],
        },
        TestCase {
            name: "zero stays zero",
            input: vec![0.0],
            expected: vec![0.0],
        },
        TestCase {
            name: "no points",
            input: vec![],
            expected: vec![],
        },
    ];

    for case in cases {
        let next = RecordingConsumer::ok();
        let processor = MultiplyByTwoProcessor::new(next.clone());
        let mut batch = sum_batch(&case.input);
        let before = batch.clone();

        processor
            .consume_metrics(&ConsumeContext::new(), &mut batch)
            .await
            .unwrap_or_else(|err| panic!("{}: {err}", case.name));

        assert_eq!(sum_values(&batch, "bytes_sent"), doubles(&case.expected), "{}", case.name);
        assert_eq!(batch.resource_metrics.len(), before.resource_metrics.len());
        assert_eq!(
            batch.resource_metrics[0].scope_metrics.len(),
            before.resource_metrics[0].scope_metrics.len()
        );
        assert_eq!(batch.metric_count(), before.metric_count(), "{}", case.name);
        assert_eq!(batch.data_point_count(), before.data_point_count(), "{}", case.name);
        assert_eq!(batch.resource_metrics[0].resource, before.resource_metrics[0].resource);

        let seen = next.seen();
        assert_eq!(seen.len(), 1, "{}", case.name);
        assert_eq!(seen[0], batch, "{}: downstream sees the doubled batch", case.name);
    }
}

#[tokio::test]
async fn empty_batch_is_forwarded_with_downstream_result() {
    let failure = ConsumerError::Unavailable("exporter down".to_string());
    let next = RecordingConsumer::answering(Err(failure.clone()));
    let processor = MultiplyByTwoProcessor::new(next.clone());
    let mut batch = Metrics::new();

    let result = processor.consume_metrics(&ConsumeContext::new(), &mut batch).await;

    assert_eq!(result, Err(failure));
    assert_eq!(next.seen(), vec![Metrics::new()]);

    let ok_next = RecordingConsumer::ok();
    let processor = MultiplyByTwoProcessor::new(ok_next.clone());
    assert_eq!(processor.consume_metrics(&ConsumeContext::new(), &mut batch).await, Ok(()));
    assert!(ok_next.seen()[0].is_empty());
}

#[tokio::test]
async fn repeated_calls_accumulate() {
    let processor = MultiplyByTwoProcessor::new(RecordingConsumer::ok());
    let mut batch = sum_batch(&[1.0, 2.5, -3.0]);
    let ctx = ConsumeContext::for_pipeline("metrics/double");

    processor.consume_metrics(&ctx, &mut batch).await.unwrap();
    processor.consume_metrics(&ctx, &mut batch).await.unwrap();

    assert_eq!(sum_values(&batch, "bytes_sent"), doubles(&[4.0, 10.0, -12.0]));
}

#[tokio::test]
async fn downstream_error_is_returned_unchanged() {
    let rejected = ConsumerError::Rejected("queue full".to_string());
    let processor = MultiplyByTwoProcessor::new(RecordingConsumer::answering(Err(rejected.clone())));
    let mut batch = sum_batch(&[3.0]);

    let err = processor
        .consume_metrics(&ConsumeContext::new(), &mut batch)
        .await
        .unwrap_err();

    assert_eq!(err, rejected);
    // The mutation happened before forwarding.
    assert_eq!(sum_values(&batch, "bytes_sent"), doubles(&[6.0]));
}

#[tokio::test]
async fn only_sum_metrics_are_touched() {
    let next = RecordingConsumer::ok();
    let processor = MultiplyByTwoProcessor::new(next.clone());
    let histogram_point = HistogramDataPoint {
        count: 4,
        sum: Some(10.0),
        bucket_counts: vec![1, 3],
        explicit_bounds: vec![5.0],
        ..Default::default()
    };
    let mut batch = Metrics::new()
        .with_resource(
            ResourceMetrics::new(Resource::default()).with_scope(
                ScopeMetrics::new(InstrumentationScope::new("first"))
                    .with_metric(Metric::new(
                        "requests",
                        MetricData::Sum(Sum::cumulative(vec![
                            NumberDataPoint::new(7_i64),
                            NumberDataPoint::new(-4_i64).with_attribute("route", "/"),
                        ])),
                    ))
                    .with_metric(Metric::new(
                        "temperature",
                        MetricData::Gauge(Gauge {
                            data_points: vec![NumberDataPoint::new(21.5)],
                        }),
                    ))
                    .with_metric(Metric::new(
                        "latency",
                        MetricData::Histogram(Histogram {
                            data_points: vec![histogram_point.clone()],
                            ..Default::default()
                        }),
                    )),
            ),
        )
        .with_resource(
            ResourceMetrics::new(Resource::default()).with_scope(
                ScopeMetrics::new(InstrumentationScope::new("second")).with_metric(Metric::new(
                    "errors",
                    MetricData::Sum(Sum::cumulative(vec![NumberDataPoint::new(0.25)])),
                )),
            ),
        );

    processor
        .consume_metrics(&ConsumeContext::new(), &mut batch)
        .await
        .unwrap();

    assert_eq!(
        sum_values(&batch, "requests"),
        vec![NumberValue::Int(14), NumberValue::Int(-8)]
    );
    assert_eq!(sum_values(&batch, "temperature"), doubles(&[21.5]));
    assert_eq!(sum_values(&batch, "errors"), doubles(&[0.5]));
    match &batch.find_metric("latency").unwrap().data {
        MetricData::Histogram(histogram) => assert_eq!(histogram.data_points, vec![histogram_point]),
        other => panic!("unexpected metric data {other:?}"),
    }
    assert_eq!(next.seen().len(), 1);
}

#[test]
fn declares_in_place_mutation() {
    let processor = MultiplyByTwoProcessor::new(RecordingConsumer::ok());
    assert!(processor.capabilities().mutates_data);
    assert!(!RecordingConsumer::ok().capabilities().mutates_data);
}
