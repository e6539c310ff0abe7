//! Meters own observable instruments and drive their callbacks.

use std::collections::HashMap;

use prometheus::{IntGauge, Opts, Registry};
use thiserror::Error;

use crate::instrument::{Int64Callback, Int64Observer, InstrumentDescriptor, ObservableGaugeHandle};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("instrument {0} already registered")]
    Duplicate(String),
    #[error("instrument {0} not registered")]
    NotRegistered(String),
    #[error("invalid instrument name: {0:?}")]
    InvalidName(String),
    #[error("prometheus registry error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Registration interface handed to instrument producers.
///
/// The meter decides when callbacks run; producers only describe what to
/// measure.
pub trait Meter {
    /// Instrumentation scope name of this meter.
    fn name(&self) -> &str;

    fn register_int64_observable_gauge(
        &mut self,
        descriptor: InstrumentDescriptor,
        callback: Int64Callback,
    ) -> Result<ObservableGaugeHandle, RegistrationError>;

    /// Whether an instrument named `name` is registered.
    fn contains(&self, name: &str) -> bool;

    /// Remove a previously registered instrument and stop running its callback.
    fn unregister(&mut self, handle: &ObservableGaugeHandle) -> Result<(), RegistrationError>;
}

/// Value collected for one instrument during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub name: String,
    pub value: Option<i64>,
}

/// Outcome of a single [`PrometheusMeter::collect`] call, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub readings: Vec<Reading>,
}

impl CollectionReport {
    pub fn get(&self, name: &str) -> Option<i64> {
        self.readings
            .iter()
            .find(|reading| reading.name == name)
            .and_then(|reading| reading.value)
    }

    /// Number of instruments that produced a value this tick.
    pub fn observed(&self) -> usize {
        self.readings
            .iter()
            .filter(|reading| reading.value.is_some())
            .count()
    }

    /// Number of instruments that stayed silent this tick.
    pub fn missing(&self) -> usize {
        self.readings.len() - self.observed()
    }
}

struct RegisteredGauge {
    descriptor: InstrumentDescriptor,
    callback: Int64Callback,
    gauge: IntGauge,
}

/// [`Meter`] publishing observable gauges as Prometheus `IntGauge`s.
///
/// Const labels set on the meter are attached to every gauge it registers,
/// which is how the service identity reaches the exported series.
pub struct PrometheusMeter {
    name: String,
    registry: Registry,
    const_labels: HashMap<String, String>,
    gauges: Vec<RegisteredGauge>,
}

impl PrometheusMeter {
    pub fn new(name: impl Into<String>, registry: Registry) -> Self {
        Self {
            name: name.into(),
            registry,
            const_labels: HashMap::new(),
            gauges: Vec::new(),
        }
    }

    /// Labels applied to every gauge registered afterwards.
    pub fn with_const_labels(mut self, const_labels: HashMap<String, String>) -> Self {
        self.const_labels = const_labels;
        self
    }

    pub fn const_labels(&self) -> &HashMap<String, String> {
        &self.const_labels
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn instrument_count(&self) -> usize {
        self.gauges.len()
    }

    /// Run every callback once and publish what it observed.
    ///
    /// A gauge whose callback observes nothing keeps its previous value.
    pub fn collect(&self) -> CollectionReport {
        let mut readings = Vec::with_capacity(self.gauges.len());
        for registered in &self.gauges {
            let mut observer = Int64Observer::new();
            (registered.callback)(&mut observer);
            let value = observer.last();
            match value {
                Some(v) => registered.gauge.set(v),
                None => tracing::debug!(
                    instrument = %registered.descriptor.name,
                    "no observation this tick"
                ),
            }
            readings.push(Reading {
                name: registered.descriptor.name.clone(),
                value,
            });
        }
        CollectionReport { readings }
    }
}

impl Meter for PrometheusMeter {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_int64_observable_gauge(
        &mut self,
        descriptor: InstrumentDescriptor,
        callback: Int64Callback,
    ) -> Result<ObservableGaugeHandle, RegistrationError> {
        if descriptor.name.trim().is_empty() {
            return Err(RegistrationError::InvalidName(descriptor.name));
        }
        if self.contains(&descriptor.name) {
            return Err(RegistrationError::Duplicate(descriptor.name));
        }

        let help = if descriptor.description.is_empty() {
            descriptor.name.clone()
        } else {
            format!("{} ({})", descriptor.description, descriptor.unit)
        };
        let opts =
            Opts::new(descriptor.name.clone(), help).const_labels(self.const_labels.clone());
        let gauge = IntGauge::with_opts(opts)?;
        self.registry.register(Box::new(gauge.clone()))?;

        let handle = ObservableGaugeHandle::new(descriptor.clone(), self.gauges.len());
        tracing::debug!(meter = %self.name, instrument = %handle, "registered observable gauge");
        self.gauges.push(RegisteredGauge {
            descriptor,
            callback,
            gauge,
        });
        Ok(handle)
    }

    fn contains(&self, name: &str) -> bool {
        self.gauges
            .iter()
            .any(|registered| registered.descriptor.name == name)
    }

    fn unregister(&mut self, handle: &ObservableGaugeHandle) -> Result<(), RegistrationError> {
        let position = self
            .gauges
            .iter()
            .position(|registered| registered.descriptor.name == handle.name())
            .ok_or_else(|| RegistrationError::NotRegistered(handle.name().to_string()))?;
        let registered = self.gauges.remove(position);
        self.registry.unregister(Box::new(registered.gauge))?;
        tracing::debug!(meter = %self.name, instrument = %handle, "unregistered observable gauge");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    fn gauge_value(registry: &Registry, name: &str) -> Option<i64> {
        registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)
            .map(|family| family.get_metric()[0].get_gauge().get_value() as i64)
    }

    #[test]
    fn collect_publishes_observations() {
        let registry = Registry::new();
        let mut meter = PrometheusMeter::new("test", registry.clone());
        let next = Arc::new(AtomicI64::new(41));
        let source = next.clone();
        meter
            .register_int64_observable_gauge(
                InstrumentDescriptor::new("answer", "The answer", "1"),
                Box::new(move |observer: &mut Int64Observer| {
                    observer.observe(source.fetch_add(1, Ordering::SeqCst));
                }),
            )
            .unwrap();

        let report = meter.collect();
        assert_eq!(report.get("answer"), Some(41));
        assert_eq!(gauge_value(&registry, "answer"), Some(41));

        let report = meter.collect();
        assert_eq!(report.get("answer"), Some(42));
        assert_eq!(gauge_value(&registry, "answer"), Some(42));
    }

    #[test]
    fn silent_tick_keeps_previous_value() {
        let registry = Registry::new();
        let mut meter = PrometheusMeter::new("test", registry.clone());
        let calls = Arc::new(AtomicI64::new(0));
        let counter = calls.clone();
        meter
            .register_int64_observable_gauge(
                InstrumentDescriptor::new("flaky", "Sometimes silent", "1"),
                Box::new(move |observer: &mut Int64Observer| {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        observer.observe(5);
                    }
                }),
            )
            .unwrap();

        assert_eq!(meter.collect().observed(), 1);
        let report = meter.collect();
        assert_eq!(report.missing(), 1);
        assert_eq!(report.get("flaky"), None);
        assert_eq!(gauge_value(&registry, "flaky"), Some(5));
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let mut meter = PrometheusMeter::new("test", Registry::new());
        meter
            .register_int64_observable_gauge(
                InstrumentDescriptor::new("dup", "first", "1"),
                Box::new(|_: &mut Int64Observer| {}),
            )
            .unwrap();

        let err = meter
            .register_int64_observable_gauge(
                InstrumentDescriptor::new("dup", "second", "1"),
                Box::new(|_: &mut Int64Observer| {}),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate(name) if name == "dup"));

        let err = meter
            .register_int64_observable_gauge(
                InstrumentDescriptor::new(" ", "blank", "1"),
                Box::new(|_: &mut Int64Observer| {}),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidName(_)));
        assert_eq!(meter.instrument_count(), 1);
    }

    #[test]
    fn unregister_removes_gauge_and_callback() {
        let registry = Registry::new();
        let mut meter = PrometheusMeter::new("test", registry.clone());
        let handle = meter
            .register_int64_observable_gauge(
                InstrumentDescriptor::new("gone", "Removed later", "1"),
                Box::new(|observer: &mut Int64Observer| observer.observe(1)),
            )
            .unwrap();
        assert!(meter.contains("gone"));

        meter.unregister(&handle).unwrap();
        assert!(!meter.contains("gone"));
        assert_eq!(meter.instrument_count(), 0);
        assert!(meter.collect().readings.is_empty());
        assert_eq!(gauge_value(&registry, "gone"), None);

        let err = meter.unregister(&handle).unwrap_err();
        assert!(matches!(err, RegistrationError::NotRegistered(name) if name == "gone"));
    }

    #[test]
    fn const_labels_are_attached_to_gauges() {
        let registry = Registry::new();
        let labels = HashMap::from([("service_name".to_string(), "edge".to_string())]);
        let mut meter = PrometheusMeter::new("test", registry.clone()).with_const_labels(labels);
        meter
            .register_int64_observable_gauge(
                InstrumentDescriptor::new("labelled", "With labels", "1"),
                Box::new(|observer: &mut Int64Observer| observer.observe(2)),
            )
            .unwrap();
        meter.collect();

        let families = registry.gather();
        let family = families
            .iter()
            .find(|family| family.get_name() == "labelled")
            .expect("labelled family");
        let label = &family.get_metric()[0].get_label()[0];
        assert_eq!(label.get_name(), "service_name");
        assert_eq!(label.get_value(), "edge");
    }

    #[test]
    fn prometheus_rejects_malformed_names() {
        let mut meter = PrometheusMeter::new("test", Registry::new());
        let err = meter
            .register_int64_observable_gauge(
                InstrumentDescriptor::new("cpu usage", "space in name", "1"),
                Box::new(|_: &mut Int64Observer| {}),
            )
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Prometheus(_)));
    }
}
