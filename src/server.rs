//! Process wiring: usage collection, scrape endpoint and shutdown.
//!
//! The collection loop is the only timer in the process. Every tick runs the
//! registered gauge callbacks on a blocking thread, since they call into the
//! operating system.

use std::future::Future;
use std::time::Duration;

use flow::ProcessorRegistry;
use thiserror::Error;

#[cfg(feature = "metrics")]
pub use collector::{UsageCollector, SERVICE_NAME_LABEL, SERVICE_VERSION_LABEL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub service_name: String,
    pub service_version: String,
    pub metrics_enabled: bool,
    pub metrics_addr: String,
    pub collect_interval: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        crate::config::AppConfig::default().to_server_options()
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid metrics address {addr:?}: {reason}")]
    InvalidAddr { addr: String, reason: String },
    #[cfg(feature = "metrics")]
    #[error("failed to register usage gauges: {0}")]
    Registration(#[from] telemetry::RegistrationError),
    #[error("failed to start metrics exporter: {0}")]
    Exporter(String),
}

pub struct ServerContext {
    options: ServerOptions,
    #[cfg(feature = "metrics")]
    collector: Option<UsageCollector>,
}

impl ServerContext {
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Context collecting into `collector` without a scrape endpoint.
    #[cfg(feature = "metrics")]
    pub fn with_collector(options: ServerOptions, collector: UsageCollector) -> Self {
        Self {
            options,
            collector: Some(collector),
        }
    }

    #[cfg(feature = "metrics")]
    pub fn collector(&self) -> Option<&UsageCollector> {
        self.collector.as_ref()
    }

    #[cfg(feature = "metrics")]
    async fn collect_tick(&self) {
        if let Some(collector) = self.collector.as_ref() {
            let report = collector.collect().await;
            tracing::debug!(
                observed = report.observed(),
                missing = report.missing(),
                "collection tick"
            );
        }
    }

    #[cfg(not(feature = "metrics"))]
    async fn collect_tick(&self) {}
}

/// Processor registry with the builtin processors. Callers may register their
/// own factories before passing it to [`init`], which reports what is
/// available.
pub fn prepare_registry() -> ProcessorRegistry {
    ProcessorRegistry::with_builtin()
}

pub async fn init(
    options: ServerOptions,
    processors: ProcessorRegistry,
) -> Result<ServerContext, ServerError> {
    tracing::info!(
        service = %options.service_name,
        version = %options.service_version,
        processors = ?processors.type_names(),
        "initializing"
    );

    #[cfg(feature = "metrics")]
    let collector = if options.metrics_enabled {
        let addr = options
            .metrics_addr
            .parse()
            .map_err(|err: std::net::AddrParseError| ServerError::InvalidAddr {
                addr: options.metrics_addr.clone(),
                reason: err.to_string(),
            })?;
        let mut collector = UsageCollector::register(
            prometheus::default_registry().clone(),
            &options.service_name,
            &options.service_version,
        )?;
        collector.serve(addr)?;
        Some(collector)
    } else {
        tracing::info!("metrics disabled by configuration");
        None
    };

    if cfg!(not(feature = "metrics")) && options.metrics_enabled {
        tracing::warn!("metrics requested but the binary was built without the metrics feature");
    }

    Ok(ServerContext {
        options,
        #[cfg(feature = "metrics")]
        collector,
    })
}

/// Run until Ctrl-C.
pub async fn start(ctx: ServerContext) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    run_until(ctx, shutdown_signal()).await;
    Ok(())
}

/// Drive collection ticks until `shutdown` resolves.
pub async fn run_until<F>(ctx: ServerContext, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(ctx.options.collect_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!(interval = ?ctx.options.collect_interval, "collection loop started");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown requested, stopping collection loop");
                break;
            }
            _ = ticker.tick() => ctx.collect_tick().await,
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c, shutting down");
    }
}

#[cfg(feature = "metrics")]
mod collector {
    use std::net::SocketAddr;
    use std::collections::HashMap;
    use std::sync::Arc;

    use prometheus::Registry;
    use telemetry::{
        CollectionReport, PrometheusMeter, RegistrationError, SysinfoProbe, UsageMetrics,
        UsageSampler, METER_NAME,
    };

    use super::ServerError;

    pub const SERVICE_NAME_LABEL: &str = "service_name";
    pub const SERVICE_VERSION_LABEL: &str = "service_version";

    /// Usage gauges registered on a Prometheus registry, plus the optional
    /// scrape endpoint serving them.
    pub struct UsageCollector {
        meter: Arc<PrometheusMeter>,
        usage: UsageMetrics,
        exporter: Option<prometheus_exporter::Exporter>,
    }

    impl UsageCollector {
        /// Register the usage gauges on `registry`, labelled with the service
        /// identity so every exported series carries it.
        pub fn register(
            registry: Registry,
            service_name: &str,
            service_version: &str,
        ) -> Result<Self, RegistrationError> {
            let const_labels = HashMap::from([
                (SERVICE_NAME_LABEL.to_string(), service_name.to_string()),
                (SERVICE_VERSION_LABEL.to_string(), service_version.to_string()),
            ]);
            let mut meter =
                PrometheusMeter::new(METER_NAME, registry).with_const_labels(const_labels);
            let usage = UsageSampler::new(SysinfoProbe::new()).register(&mut meter)?;
            Ok(Self {
                meter: Arc::new(meter),
                usage,
                exporter: None,
            })
        }

        /// Start serving the default Prometheus registry on `addr`.
        pub fn serve(&mut self, addr: SocketAddr) -> Result<(), ServerError> {
            let exporter = prometheus_exporter::start(addr)
                .map_err(|err| ServerError::Exporter(err.to_string()))?;
            tracing::info!(%addr, "serving metrics on /metrics");
            self.exporter = Some(exporter);
            Ok(())
        }

        pub fn usage(&self) -> &UsageMetrics {
            &self.usage
        }

        pub fn registry(&self) -> &Registry {
            self.meter.registry()
        }

        pub fn is_serving(&self) -> bool {
            self.exporter.is_some()
        }

        pub async fn collect(&self) -> CollectionReport {
            let meter = Arc::clone(&self.meter);
            match tokio::task::spawn_blocking(move || meter.collect()).await {
                Ok(report) => report,
                Err(err) => {
                    tracing::error!(error = %err, "collection task failed");
                    CollectionReport::default()
                }
            }
        }
    }
}
