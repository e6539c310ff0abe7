pub mod consumer;
pub mod model;
pub mod processor;

pub use consumer::{Capabilities, ConsumeContext, ConsumerError, MetricsConsumer};
pub use model::{Metric, MetricData, Metrics};
pub use processor::{MultiplyByTwoProcessor, ProcessorRegistry, MULTIPLY_BY_TWO};
