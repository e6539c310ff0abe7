//! Consumer contract shared by every metrics pipeline stage.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Metrics;

/// Per-call context handed down the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumeContext {
    pipeline: Option<String>,
}

impl ConsumeContext {
    /// Context without a pipeline name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context tagged with the pipeline driving the call.
    pub fn for_pipeline(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: Some(pipeline.into()),
        }
    }

    pub fn pipeline(&self) -> Option<&str> {
        self.pipeline.as_deref()
    }
}

/// What a consumer does to the batches it receives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The consumer rewrites the batch in place. Callers must not reuse the
    /// batch expecting its original values afterwards.
    pub mutates_data: bool,
}

/// Failure reported by a consumer; forwarding stages return it unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsumerError {
    #[error("batch rejected: {0}")]
    Rejected(String),
    #[error("consumer unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Other(String),
}

/// A stage that accepts metric batches.
///
/// The batch is lent exclusively for the duration of the call. Stages that
/// forward it pass the same borrow along, so any mutation they perform is
/// visible to the caller once the call returns.
#[async_trait]
pub trait MetricsConsumer: Send + Sync {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    async fn consume_metrics(
        &self,
        ctx: &ConsumeContext,
        metrics: &mut Metrics,
    ) -> Result<(), ConsumerError>;
}
