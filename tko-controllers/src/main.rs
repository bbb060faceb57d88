//! TKO Controllers
//!
//! Runs the preparation and instantiation controllers against an in-memory
//! backend until interrupted.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Backend: Memory store behind the validating decorator
//! - Controllers: Preparation and instantiation loops

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tko_backend::{Backend, MemoryBackend, RegistryValidation, ValidatingBackend, Validation};
use tko_controllers::config::Config;
use tko_controllers::preparation::topology::register_topology_preparers;
use tko_controllers::{Controller, Instantiation, Preparation};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tko_controllers=info,tko_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TKO controllers");

    let config = load_config()?;
    info!(
        "Loaded configuration: modification_window={:?}, auto_approve={}",
        config.modification_window, config.auto_approve
    );

    let validation: Arc<dyn Validation> = Arc::new(RegistryValidation::new());
    let store: Arc<dyn Backend> = Arc::new(MemoryBackend::new(config.modification_window));
    let backend: Arc<dyn Backend> = Arc::new(ValidatingBackend::new(store, validation.clone()));
    backend.connect().await.context("Failed to connect backend")?;

    let mut preparation = Preparation::new(backend.clone(), validation, config.plugin_settings())
        .with_auto_approve(config.auto_approve);
    register_topology_preparers(&mut preparation, None);
    let instantiation = Instantiation::new(backend.clone(), config.plugin_settings());

    let mut controllers = vec![
        Controller::start(
            "preparation",
            Arc::new(preparation),
            config.preparation_interval,
        ),
        Controller::start(
            "instantiation",
            Arc::new(instantiation),
            config.instantiation_interval,
        ),
    ];

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    for controller in &mut controllers {
        controller.stop().await;
    }
    backend.release().await.context("Failed to release backend")?;

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(err) => {
            info!("Failed to load config from environment ({}), using defaults", err);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
