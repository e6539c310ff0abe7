//! Processor factories addressable by type name.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::consumer::MetricsConsumer;
use crate::processor::multiply_by_two::{MultiplyByTwoProcessor, MULTIPLY_BY_TWO};

/// Failures looking up or registering processor factories.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("unknown processor type: {0}")]
    UnknownType(String),
    #[error("processor type already registered: {0}")]
    AlreadyRegistered(String),
}

/// Builds a processor in front of a downstream consumer.
pub trait ProcessorFactory: Send + Sync {
    /// Name the factory is addressed by.
    fn type_name(&self) -> &str;

    /// Build a processor forwarding to `next`.
    fn create(&self, next: Arc<dyn MetricsConsumer>) -> Arc<dyn MetricsConsumer>;
}

/// Factory from a type name and a constructor function.
pub struct FnProcessorFactory<F> {
    type_name: String,
    constructor: F,
}

impl<F> ProcessorFactory for FnProcessorFactory<F>
where
    F: Fn(Arc<dyn MetricsConsumer>) -> Arc<dyn MetricsConsumer> + Send + Sync,
{
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn create(&self, next: Arc<dyn MetricsConsumer>) -> Arc<dyn MetricsConsumer> {
        (self.constructor)(next)
    }
}

/// Create a factory addressed by `type_name` that builds processors with
/// `constructor`.
pub fn new_factory<F>(type_name: impl Into<String>, constructor: F) -> FnProcessorFactory<F>
where
    F: Fn(Arc<dyn MetricsConsumer>) -> Arc<dyn MetricsConsumer> + Send + Sync,
{
    FnProcessorFactory {
        type_name: type_name.into(),
        constructor,
    }
}

/// Factory for [`MultiplyByTwoProcessor`].
pub fn multiply_by_two_factory() -> impl ProcessorFactory {
    new_factory(MULTIPLY_BY_TWO, |next| {
        Arc::new(MultiplyByTwoProcessor::new(next)) as Arc<dyn MetricsConsumer>
    })
}

/// Name-keyed set of processor factories.
#[derive(Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, Arc<dyn ProcessorFactory>>,
}

impl ProcessorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the processors shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            MULTIPLY_BY_TWO.to_string(),
            Arc::new(multiply_by_two_factory()),
        );
        registry
    }

    /// Add `factory`; fails if its type name is already taken.
    pub fn register(
        &mut self,
        factory: impl ProcessorFactory + 'static,
    ) -> Result<(), ProcessorError> {
        let type_name = factory.type_name().to_string();
        if self.factories.contains_key(&type_name) {
            return Err(ProcessorError::AlreadyRegistered(type_name));
        }
        self.factories.insert(type_name, Arc::new(factory));
        Ok(())
    }

    /// Whether a factory is registered under `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names in sorted order.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the processor registered under `type_name` in front of `next`.
    pub fn create(
        &self,
        type_name: &str,
        next: Arc<dyn MetricsConsumer>,
    ) -> Result<Arc<dyn MetricsConsumer>, ProcessorError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| ProcessorError::UnknownType(type_name.to_string()))?;
        Ok(factory.create(next))
    }
}
