//! Observable instrument building blocks.

use std::fmt;

/// Metadata describing an instrument at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    pub name: String,
    pub description: String,
    pub unit: String,
}

impl InstrumentDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
        }
    }
}

/// Receives the values a callback reports during one collection tick.
///
/// A gauge callback is expected to observe zero or one value; when several are
/// observed the meter keeps the last one.
#[derive(Debug, Default)]
pub struct Int64Observer {
    observations: Vec<i64>,
}

impl Int64Observer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, value: i64) {
        self.observations.push(value);
    }

    pub fn observations(&self) -> &[i64] {
        &self.observations
    }

    pub fn last(&self) -> Option<i64> {
        self.observations.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Callback invoked by the meter on every collection tick.
pub type Int64Callback = Box<dyn Fn(&mut Int64Observer) + Send + Sync>;

/// Handle returned by a meter for a registered observable gauge.
///
/// The handle only identifies the instrument; the gauge lives as long as the
/// meter that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableGaugeHandle {
    descriptor: InstrumentDescriptor,
    index: usize,
}

impl ObservableGaugeHandle {
    pub(crate) fn new(descriptor: InstrumentDescriptor, index: usize) -> Self {
        Self { descriptor, index }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    /// Position of the gauge in the meter at the time it was registered.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for ObservableGaugeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.descriptor.name, self.descriptor.unit)
    }
}
