//! Metrics processors and sinks.

pub mod factory;
pub mod log_sink;
pub mod multiply_by_two;

pub use factory::{
    multiply_by_two_factory, new_factory, FnProcessorFactory, ProcessorError, ProcessorFactory,
    ProcessorRegistry,
};
pub use log_sink::LogSink;
pub use multiply_by_two::{MultiplyByTwoProcessor, MULTIPLY_BY_TWO};
