//! edgelink binary entry point.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use edgelink::config::{BasicValidator, ConfigLoader, CoreConfig, PortConflictValidator};
use edgelink::health::HealthSampler;
use edgelink::hub::HubClient;

/// Default configuration path next to the executable.
const CONFIG_PATH: &str = "edgelink.toml";

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());

    let loader = ConfigLoader::new()
        .with_validator(BasicValidator::new())
        .with_validator(PortConflictValidator::new());

    let config = match loader.load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        },
    };

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        hub = %format!("{}:{}", config.hub.host, config.hub.port),
        "Starting edgelink"
    );

    let sampler = HealthSampler::from_config(&config.health, &config.gateway, &config.hub);
    let client = HubClient::new(config.hub.clone(), config.gateway.clone(), sampler);

    let loops = match client.start().await {
        Ok(loops) => loops,
        Err(e) => {
            error!(error = %e, "Could not reach the hub");
            std::process::exit(1);
        },
    };

    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }

    client.shutdown();
    for task in loops {
        let _ = task.await;
    }
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set. With a configured
/// file path, output appends to that file instead of stdout.
fn init_logging(config: &CoreConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_string()));

    if let Some(path) = &config.logging.file_path {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .init();
                return;
            },
            Err(e) => eprintln!("Could not open log file {}: {e}", path.display()),
        }
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
