use pac_metrics::config::AppConfig;
use pac_metrics::server;

#[derive(Debug, Clone, Default)]
struct CliFlags {
    config_path: Option<String>,
    metrics_addr: Option<String>,
}

impl CliFlags {
    fn parse() -> Self {
        let mut flags = Self::default();
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => flags.config_path = args.next(),
                "--metrics-addr" => flags.metrics_addr = args.next(),
                _ => {}
            }
        }
        flags
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli_flags = CliFlags::parse();
    let config = match cli_flags.config_path.as_deref() {
        Some(path) => {
            let cfg = AppConfig::load_required(path)?;
            println!("[pac-metrics] loaded config: {}", path);
            cfg
        }
        None => AppConfig::default(),
    };

    let _logging_guard = pac_metrics::logging::init_logging(&config.logging)?;

    let mut options = config.to_server_options();
    if let Some(addr) = cli_flags.metrics_addr {
        options.metrics_addr = addr;
    }

    // Register custom processors on the registry here before starting, if needed.
    let processors = server::prepare_registry();

    let ctx = server::init(options, processors).await?;
    server::start(ctx).await
}
