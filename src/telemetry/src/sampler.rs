//! CPU and memory usage gauges.
//!
//! [`UsageSampler`] holds no timer. Each time the owning [`Meter`] collects,
//! the registered callbacks measure the host "now" through the shared probe.
//! A failed probe read is logged and produces no observation for that tick.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::instrument::{Int64Observer, InstrumentDescriptor, ObservableGaugeHandle};
use crate::meter::{Meter, RegistrationError};
use crate::probe::{ProbeError, SystemProbe};

pub const METER_NAME: &str = "systemUsage";
pub const CPU_USAGE_GAUGE: &str = "cpuUsage";
pub const MEMORY_USAGE_GAUGE: &str = "memoryUsage";
pub const PERCENTAGE_UNIT: &str = "percentage";

/// Samples host utilization through a [`SystemProbe`].
pub struct UsageSampler<P> {
    probe: Arc<Mutex<P>>,
}

impl<P> Clone for UsageSampler<P> {
    fn clone(&self) -> Self {
        Self {
            probe: Arc::clone(&self.probe),
        }
    }
}

impl<P: SystemProbe + 'static> UsageSampler<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe: Arc::new(Mutex::new(probe)),
        }
    }

    /// Observe aggregate CPU utilization, truncated to a whole percent.
    pub fn sample_cpu(&self, observer: &mut Int64Observer) {
        let reading = self.lock_probe().cpu_percent().and_then(finite("cpu"));
        match reading {
            Ok(percent) => observer.observe(percent as i64),
            Err(err) => tracing::warn!(error = %err, "failed to get cpu usage"),
        }
    }

    /// Observe used virtual memory, truncated to a whole percent.
    pub fn sample_memory(&self, observer: &mut Int64Observer) {
        let reading = self
            .lock_probe()
            .virtual_memory()
            .map(|stats| stats.used_percent)
            .and_then(finite("memory"));
        match reading {
            Ok(percent) => observer.observe(percent as i64),
            Err(err) => tracing::warn!(error = %err, "failed to get memory usage"),
        }
    }

    /// Register the `cpuUsage` and `memoryUsage` gauges on `meter`.
    ///
    /// Either both gauges are registered or the meter is left as it was.
    pub fn register<M: Meter + ?Sized>(
        &self,
        meter: &mut M,
    ) -> Result<UsageMetrics, RegistrationError> {
        for name in [CPU_USAGE_GAUGE, MEMORY_USAGE_GAUGE] {
            if meter.contains(name) {
                return Err(RegistrationError::Duplicate(name.to_string()));
            }
        }

        let sampler = self.clone();
        let cpu_usage = meter.register_int64_observable_gauge(
            InstrumentDescriptor::new(CPU_USAGE_GAUGE, "The CPU usage", PERCENTAGE_UNIT),
            Box::new(move |observer: &mut Int64Observer| sampler.sample_cpu(observer)),
        )?;

        let sampler = self.clone();
        let memory_usage = match meter.register_int64_observable_gauge(
            InstrumentDescriptor::new(MEMORY_USAGE_GAUGE, "The memory usage", PERCENTAGE_UNIT),
            Box::new(move |observer: &mut Int64Observer| sampler.sample_memory(observer)),
        ) {
            Ok(handle) => handle,
            Err(err) => {
                if let Err(rollback) = meter.unregister(&cpu_usage) {
                    tracing::warn!(error = %rollback, "failed to roll back cpu usage gauge");
                }
                return Err(err);
            }
        };

        tracing::info!(meter = meter.name(), "usage gauges registered");
        Ok(UsageMetrics {
            cpu_usage,
            memory_usage,
        })
    }

    fn lock_probe(&self) -> MutexGuard<'_, P> {
        // A panic inside one probe call leaves the probe itself usable.
        self.probe
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn finite(what: &'static str) -> impl Fn(f64) -> Result<f64, ProbeError> {
    move |value| {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ProbeError::NonFinite(what))
        }
    }
}

/// Handles of the registered usage gauges.
#[derive(Debug, Clone)]
pub struct UsageMetrics {
    pub cpu_usage: ObservableGaugeHandle,
    pub memory_usage: ObservableGaugeHandle,
}
