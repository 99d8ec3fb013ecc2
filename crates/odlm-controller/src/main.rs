use std::env;
use std::sync::Arc;

use anyhow::Context;
use odlm_controller::bootstrap::{apply_manifests, load_manifests};
use odlm_controller::config::loader::{DEFAULT_CONFIG_PATH, load_config};
use odlm_controller::{AppConfig, Controller};
use odlm_core::events::EventBus;
use odlm_db_memory::InMemoryStore;
use odlm_storage::{DynStore, EventedStore};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From ODLM_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (odlm.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (ODLM_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    odlm_controller::observability::init_tracing();

    let (config_path, source) = resolve_config_path();
    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );
    odlm_controller::observability::apply_logging_level(&cfg.logging.level);

    if let Err(e) = run(cfg).await {
        tracing::error!(error = ?e, "Controller failed");
        eprintln!("Controller error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::with_capacity(cfg.controller.event_buffer));
    let store: DynStore = Arc::new(EventedStore::new(InMemoryStore::new(), Arc::clone(&bus)));

    let controller = Controller::new(Arc::clone(&store), bus, &cfg.controller, &cfg.retry);
    controller
        .start()
        .await
        .context("failed to start controller")?;

    if let Some(dir) = &cfg.bootstrap.manifests_dir {
        let manifests = load_manifests(dir)
            .with_context(|| format!("failed to load manifests from {}", dir.display()))?;
        apply_manifests(&store, manifests)
            .await
            .context("failed to apply manifests")?;
    }

    tracing::info!("Controller running, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    controller.shutdown().await;
    Ok(())
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: ODLM_CONFIG
/// 3. Default: odlm.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, ConfigSource::CliArgument);
            }
        }
    }

    if let Ok(path) = env::var("ODLM_CONFIG") {
        if !path.is_empty() {
            return (path, ConfigSource::EnvironmentVariable);
        }
    }

    (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
}
