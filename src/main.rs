//! Image Classification Service
//!
//! Loads every model listed in the definition file, then serves
//! multi-model predictions over HTTP (Axum).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use image_classifier::api::{create_rest_router, AppState};
use image_classifier::config::Config;
use image_classifier::engine::{ModelPool, ModelRegistry};
use image_classifier::error::ConfigError;
use image_classifier::service::AnalyzeService;
use image_classifier::telemetry;

const USAGE: &str = "usage: image-classifier serve [config.toml]";

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() != Some("serve") {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(Config::default_path()));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(config_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            eprintln!("image-classifier: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config_path: PathBuf) -> Result<()> {
    // A missing config file falls back to defaults; a malformed one is fatal
    let (config, fallback) = match Config::load(&config_path) {
        Ok(config) => (config, None),
        Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            (Config::default(), Some(config_path.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    telemetry::init_logging(&config.logging)?;

    info!("Starting Image Classification Service v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = fallback {
        warn!("Config file {} not found, using defaults", path);
    }

    info!("Configuration loaded:");
    info!("  Listen: {}", config.bind_addr());
    info!("  Device: {}", config.inference.device);
    info!("  Model definitions: {}", config.models.definitions.display());
    info!("  Max concurrent requests: {}", config.inference.max_concurrent_requests);

    // Load every model before binding the listener
    let start = Instant::now();
    let registry = ModelRegistry::load(&config.models.definitions)?;
    info!("{} model(s) registered", registry.len());

    let inference = config.inference.clone();
    let models_dir = config.models.dir.clone();
    let pool = tokio::task::spawn_blocking(move || -> Result<ModelPool> {
        let pool = ModelPool::load(&registry, &inference, &models_dir)?;
        if inference.warmup {
            pool.warmup()?;
        }
        Ok(pool)
    })
    .await
    .context("model loading task failed")??;
    info!("All models ready in {:?}", start.elapsed());

    let service = Arc::new(AnalyzeService::new(Arc::new(pool), &config.inference));
    let state = Arc::new(AppState {
        service,
        view_dir: config.server.view_dir.clone(),
    });
    let router = create_rest_router(state, &config.server);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("REST API listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections...");
}
