// promptdeck - Interactive prompt-authoring console
//
// A terminal playground for composing prompts, picking a model and sampling
// parameters, and collecting request/response turns into a transcript.
//
// Architecture:
// - Session store: the state machine owning the transcript and the
//   single-flight generation discipline
// - Generation service: mock backend or an OpenAI-compatible HTTP endpoint
// - Catalog: models and prompt templates, bundled or from a TOML file
// - TUI (ratatui): renders the session snapshot, forwards commands
// - Event system: mpsc channel feeding background-task results to the loop

mod catalog;
mod cli;
mod config;
mod events;
mod export;
mod generation;
mod logging;
mod session;
mod tui;

use anyhow::Result;
use catalog::{BundledCatalog, CatalogProvider, FileCatalog};
use chrono::Utc;
use clap::Parser;
use config::{Config, LogRotation};
use events::AppEvent;
use generation::{GenerationService, HttpGeneration, MockGeneration};
use logging::{LogBuffer, TuiLogLayer};
use session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --path, --reset)
    // If a command was handled, exit early
    let cli = cli::Cli::parse();
    if cli::handle_cli(&cli) {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let mut config = Config::from_env();
    if cli.mock {
        config.mock = true;
    }

    // Logs go to an in-memory buffer the TUI renders; stdout would garble
    // the alternate screen. File logging is opt-in on top of that.
    //
    // Precedence: RUST_LOG env var > config file > default "info"
    let log_buffer = LogBuffer::new();
    let default_filter = format!("promptdeck={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // The guard must stay alive for the program's duration so logs flush
    let mut _file_guard: Option<tracing_appender::non_blocking::WorkerGuard> = None;
    let file_layer = if config.logging.file_enabled {
        match std::fs::create_dir_all(&config.logging.file_dir) {
            Ok(()) => {
                let appender = match config.logging.file_rotation {
                    LogRotation::Hourly => {
                        tracing_appender::rolling::hourly(&config.logging.file_dir, "promptdeck.log")
                    }
                    LogRotation::Daily => {
                        tracing_appender::rolling::daily(&config.logging.file_dir, "promptdeck.log")
                    }
                    LogRotation::Never => {
                        tracing_appender::rolling::never(&config.logging.file_dir, "promptdeck.log")
                    }
                };
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                _file_guard = Some(guard);
                // JSON format so the files are parseable with jq
                Some(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    config.logging.file_dir, e
                );
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(TuiLogLayer::new(log_buffer.clone()))
        .with(file_layer)
        .init();

    tracing::info!("promptdeck v{} starting", config::VERSION);

    // Event channel: background tasks (catalog load, generation calls) post
    // their results here; the TUI loop is the single consumer
    let (event_tx, event_rx) = mpsc::channel(64);

    // Spawn the one-shot catalog fetch; failure is degraded, not fatal
    let provider: Arc<dyn CatalogProvider> = match &config.catalog_path {
        Some(path) => {
            tracing::info!("Loading catalog from {:?}", path);
            Arc::new(FileCatalog { path: path.clone() })
        }
        None => Arc::new(BundledCatalog::default()),
    };
    let catalog_tx = event_tx.clone();
    tokio::spawn(async move {
        let event = match provider.load().await {
            Ok(catalog) => AppEvent::CatalogLoaded {
                timestamp: Utc::now(),
                catalog,
            },
            Err(error) => AppEvent::CatalogFailed {
                timestamp: Utc::now(),
                error,
            },
        };
        let _ = catalog_tx.send(event).await;
    });

    // Pick the generation backend
    let service: Arc<dyn GenerationService> = if config.mock {
        tracing::info!("Using mock generation backend");
        Arc::new(MockGeneration {
            latency: Duration::from_millis(config.mock_latency_ms),
        })
    } else {
        tracing::info!("Using HTTP backend at {}", config.api_url);
        Arc::new(HttpGeneration::new(
            config.api_url.clone(),
            config.api_key.clone(),
        ))
    };

    let store = SessionStore::new(service, event_tx, config.default_model.clone());
    let app = tui::app::App::new(store, log_buffer, config.export_dir.clone());

    // Run the TUI in the main task; this blocks until the user quits
    tui::run_tui(app, event_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
