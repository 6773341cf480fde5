//! # Watchpost Main Application Entry Point
//!
//! This is the main executable for the Watchpost camera dashboard. It
//! handles command-line argument parsing, tracing initialization, server
//! startup, and application lifecycle management.
//!
//! ## Example Usage
//!
//! ```bash
//! # Serve the dashboard with default settings (port 3000, config.json5)
//! cargo run
//!
//! # Serve on a specific port with a specific configuration file
//! cargo run 8080 my-config.json5
//!
//! # Follow a running dashboard headlessly, logging camera status
//! cargo run follow http://127.0.0.1:3000
//! ```
//!
//! Log levels are controlled through the `RUST_LOG` environment variable.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod clock;
mod config;
mod error;
mod events;
mod index;
mod reloader;
mod server;
mod store;
mod supervisor;
mod transport;

use crate::api::HttpDirectory;
use crate::error::WatchpostError;
use crate::store::{DashboardStore, SharedStore};
use crate::supervisor::Supervisor;
use crate::transport::{events_url, WsTransport};

const FOLLOW_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Main entry point for the Watchpost application
///
/// Without arguments it serves the dashboard: first argument is the port
/// (defaults to 3000), second the configuration file path (defaults to
/// `config.json5`). With `follow <url>` it instead runs the sync engine
/// against a remote dashboard and logs camera status, which is handy for
/// watching a wall of cameras from a terminal.
///
/// # Errors
///
/// Returns an error if the server fails to start, the configuration cannot
/// be loaded, or (in follow mode) the very first connection never comes
/// up. Everything after a successful start is retried in the background.
#[tokio::main]
async fn main() -> Result<(), WatchpostError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cancel_token = CancellationToken::new();
    tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
                cancel_token.cancel();
            }
        }
    });

    let mut args = env::args().skip(1);
    match args.next() {
        Some(mode) if mode == "follow" => {
            let url = args.next().ok_or_else(|| {
                WatchpostError::from("Usage: watchpost follow <dashboard-url>")
            })?;
            tracing::info!("Following dashboard at {url}");
            follow(&url, cancel_token).await?;
        }
        first => {
            let port = first.and_then(|s| s.parse().ok()).unwrap_or(3000);
            let config_file_path = args.next().map(PathBuf::from);

            tracing::info!("Starting Watchpost dashboard server");
            server::run(port, config_file_path, cancel_token).await?;
        }
    }

    tracing::info!("Watchpost shutting down");
    Ok(())
}

/// Run the sync engine against a remote dashboard, logging a status line
/// per camera every few seconds.
async fn follow(base_url: &str, cancel: CancellationToken) -> Result<(), WatchpostError> {
    let store = DashboardStore::shared();
    let supervisor = Supervisor::new(
        store.clone(),
        WsTransport::new(events_url(base_url)?),
        HttpDirectory::new(base_url),
    );

    tokio::spawn(report_status(store, cancel.clone()));
    supervisor.run(cancel).await
}

async fn report_status(store: SharedStore, cancel: CancellationToken) {
    let mut timer = tokio::time::interval(FOLLOW_REPORT_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = timer.tick() => {}
        }

        let Ok(store) = store.read() else {
            tracing::error!("Failed to acquire store read lock");
            return;
        };
        match store.cameras() {
            None => tracing::info!("Waiting for the first full camera load"),
            Some(cameras) => {
                for camera in cameras {
                    let age = camera
                        .last_updated
                        .map_or_else(String::new, |updated| {
                            format!(", updated {}s ago", (store.now() - updated).num_seconds())
                        });
                    let status = match &camera.error {
                        _ if camera.is_powered_off => "powered off".to_string(),
                        Some(error) => format!("ERROR ({error}, {} in a row)", camera.failure_counter),
                        None => "ok".to_string(),
                    };
                    tracing::info!("{}: {status}{age}", camera.uuid);
                }
                if store.unread_count() > 0 {
                    tracing::info!("{} unread notifications", store.unread_count());
                }
            }
        }
    }
}
