//! # Watchpost Library
//!
//! This library provides the core functionality for the Watchpost camera
//! dashboard. Watchpost shows the live status of a fixed set of cameras
//! (connectivity, last-update time, failure counts and power state), fed by a
//! stream of small status events pushed over a persistent connection.
//!
//! ## Overview
//!
//! The heart of the crate is the client-side state synchronization engine:
//!
//! - `store`: the state container: camera registry, bounded notification
//!   log and connection status, with all event business rules
//! - `events`: the JSON wire format shared by server and client
//! - `clock`: the running correction between local and server clocks
//! - `transport`: the abstract event transport and its WebSocket
//!   implementation
//! - `api`: the HTTP client for the camera list and camera commands
//! - `supervisor`: the connection supervisor driving connect, full load,
//!   live processing and automatic reconnects
//!
//! Around it sits the server half that produces the feed:
//!
//! - `config`: JSON5 configuration (camera set, intervals, snapshot dir)
//! - `server`: the axum application serving the camera list, event WebSocket,
//!   powered-off command, snapshots and the dashboard page
//! - `reloader`: the round-robin snapshot refresh scheduler and clock sync
//! - `index`: the rendered dashboard shell
//! - `error`: the crate-wide error type
//!
//! ## Getting Started
//!
//! To serve a dashboard, point `server::run` at a configuration file:
//!
//! ```no_run
//! use std::path::PathBuf;
//! use tokio_util::sync::CancellationToken;
//! use watchpost::{config::CONFIG_FILE, server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), watchpost::error::WatchpostError> {
//!     let cancel_token = CancellationToken::new();
//!     let config_path = Some(PathBuf::from(CONFIG_FILE));
//!
//!     server::run(3000, config_path, cancel_token).await
//! }
//! ```
//!
//! To consume a dashboard's feed, wire the supervisor to a store:
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use watchpost::api::HttpDirectory;
//! use watchpost::store::DashboardStore;
//! use watchpost::supervisor::Supervisor;
//! use watchpost::transport::{events_url, WsTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), watchpost::error::WatchpostError> {
//!     let base = "http://127.0.0.1:3000";
//!     let store = DashboardStore::shared();
//!     let supervisor = Supervisor::new(
//!         store.clone(),
//!         WsTransport::new(events_url(base)?),
//!         HttpDirectory::new(base),
//!     );
//!     supervisor.run(CancellationToken::new()).await
//! }
//! ```
//!
//! ## Architecture
//!
//! All dashboard state transitions happen on the supervisor's single task:
//! the transport delivers events in receipt order, the reducer applies them
//! one at a time, and readers only ever take short read locks. A reconnect
//! replaces the registry wholesale from the authoritative camera list and
//! force-bumps every image version, so the rendering layer never shows an
//! image older than what was on screen before the disconnect.

/// Custom error types module
///
/// Defines the `WatchpostError` enum and related functionality for
/// consistent error handling across the application.
pub mod error;

/// Configuration management module
///
/// Loads and validates the JSON5 configuration file: the dashboard name,
/// the fixed camera set with snapshot source URLs, the reload and clock
/// sync intervals and the snapshot directory.
pub mod config;

/// Wire format module
///
/// The typed JSON events pushed over the persistent connection and the
/// shapes of the camera list endpoint, shared by the server and the sync
/// engine.
pub mod events;

/// Clock correction module
///
/// Maintains the offset between local and server time derived from
/// periodic `time` events, so "time since last update" renders accurately
/// without NTP-level synchronization.
pub mod clock;

/// State container module
///
/// The camera registry, the bounded notification log and the event
/// reducer. This is the core of the dashboard: an unordered, possibly
/// interrupted event stream goes in, a consistent monotonically-advancing
/// view of camera state comes out.
pub mod store;

/// Event transport module
///
/// The abstract open/message/close transport interface the supervisor
/// drives, and the WebSocket implementation used in production.
pub mod transport;

/// Camera API client module
///
/// The authoritative camera-list fetch performed on every (re)connect and
/// the fire-and-forget powered-off command.
pub mod api;

/// Connection supervisor module
///
/// Owns the transport lifecycle: connect, full load, live event
/// processing, and automatic reconnection with a full resync after every
/// connection loss.
pub mod supervisor;

/// Server operations module
///
/// The axum application serving the camera list, the event WebSocket, the
/// powered-off command, snapshot images and the dashboard page.
pub mod server;

/// Reload scheduler module
///
/// Refreshes cameras in a fixed round-robin rotation and broadcasts the
/// resulting status events; also emits the periodic clock sync event.
pub mod reloader;

/// Index page generation module
///
/// Renders the dashboard shell from the configured camera set.
pub mod index;
