//! Host usage instruments.
//!
//! The crate exposes observable gauges whose values are produced lazily by
//! callbacks each time a [`Meter`] collects. [`UsageSampler`] wires the CPU and
//! memory gauges against any [`SystemProbe`].

pub mod instrument;
pub mod meter;
pub mod probe;
pub mod sampler;

pub use instrument::{Int64Callback, Int64Observer, InstrumentDescriptor, ObservableGaugeHandle};
pub use meter::{CollectionReport, Meter, PrometheusMeter, RegistrationError};
pub use probe::{ProbeError, SysinfoProbe, SystemProbe, VirtualMemoryStats};
pub use sampler::{
    UsageMetrics, UsageSampler, CPU_USAGE_GAUGE, MEMORY_USAGE_GAUGE, METER_NAME, PERCENTAGE_UNIT,
};
