//! Operating system queries behind the usage gauges.

use sysinfo::System;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProbeError {
    #[error("cpu usage unavailable: {0}")]
    CpuUnavailable(String),
    #[error("memory statistics unavailable: {0}")]
    MemoryUnavailable(String),
    #[error("non-finite reading for {0}")]
    NonFinite(&'static str),
}

/// Virtual memory statistics, sizes in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualMemoryStats {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub used_percent: f64,
}

impl VirtualMemoryStats {
    /// Derive the used percentage from raw byte counts.
    pub fn from_bytes(total: u64, available: u64, used: u64) -> Result<Self, ProbeError> {
        if total == 0 {
            return Err(ProbeError::MemoryUnavailable(
                "total memory reported as zero".to_string(),
            ));
        }
        Ok(Self {
            total,
            available,
            used,
            used_percent: used as f64 / total as f64 * 100.0,
        })
    }
}

/// Source of host utilization readings.
///
/// Implementations may block briefly on a system call but must not wait on
/// anything unbounded.
pub trait SystemProbe: Send {
    /// Aggregate CPU utilization across all cores in percent, measured since
    /// the previous call.
    fn cpu_percent(&mut self) -> Result<f64, ProbeError>;

    fn virtual_memory(&mut self) -> Result<VirtualMemoryStats, ProbeError>;
}

/// [`SystemProbe`] backed by `sysinfo`.
///
/// The underlying [`System`] is kept between calls so CPU usage is the delta
/// since the last refresh. The very first CPU reading is measured against the
/// moment the probe was created.
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        Self { system }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for SysinfoProbe {
    fn cpu_percent(&mut self) -> Result<f64, ProbeError> {
        self.system.refresh_cpu();
        if self.system.cpus().is_empty() {
            return Err(ProbeError::CpuUnavailable("no cpu reported".to_string()));
        }
        let usage = f64::from(self.system.global_cpu_info().cpu_usage());
        if !usage.is_finite() {
            return Err(ProbeError::NonFinite("cpu"));
        }
        Ok(usage)
    }

    fn virtual_memory(&mut self) -> Result<VirtualMemoryStats, ProbeError> {
        self.system.refresh_memory();
        VirtualMemoryStats::from_bytes(
            self.system.total_memory(),
            self.system.available_memory(),
            self.system.used_memory(),
        )
    }
}
