//! hookline plugin host
//!
//! Loads configuration, imports and initializes plugins, fires the hooks
//! named on the command line, and stops every plugin before exiting.

mod builtin;
mod cli;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use hookline_core::config::AppConfig;
use hookline_plugin::{PluginManager, StaticLoader};

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load_from(Path::new(&cli.config_dir), &cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(cli, config).await {
        tracing::error!("hookline error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting hookline v{}", env!("CARGO_PKG_VERSION"));

    let loader = StaticLoader::new();
    builtin::register(&loader);
    let manager = PluginManager::from_config(&config, Arc::new(loader));

    manager
        .plugin(builtin::awesome_plugin(), None)
        .context("Failed to import bundled plugin")?;

    if config.plugins.auto_load {
        manager
            .import_all(None, None)
            .context("Failed to import plugins")?;
    }

    if config.plugins.auto_init {
        let report = manager.init_all(&[]).await;
        for failure in &report.failed {
            tracing::warn!(plugin = %failure.plugin, "Plugin left inactive: {}", failure.error);
        }
    }

    let outcome = cli.command.execute(&manager).await;

    let report = manager.stop_all(&[]).await;
    if !report.is_success() {
        tracing::warn!(failed = report.failed.len(), "Some plugins failed to stop cleanly");
    }

    outcome
}
