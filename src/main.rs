use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use drive::{Analytics, Config, Database, FileStorage, WebServer};

/// Configuration file used when `DRIVE_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    let config_path =
        std::env::var("DRIVE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = drive::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        drive::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    info!("drive - collaborative file storage");

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> drive::Result<()> {
    let db = Database::open(&config.database.path, config.database.max_connections).await?;
    let storage = FileStorage::new(&config.storage.path)?;
    info!("Object storage at {}", storage.base_path().display());

    let analytics = Analytics::from_config(&config.analytics)?;
    if !analytics.is_enabled() {
        info!("Analytics disabled");
    }

    let server = WebServer::new(&config, db, Arc::new(storage), analytics)?;
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );
    server.run().await?;

    Ok(())
}
