//! Connection supervisor for the event feed.
//!
//! Owns the persistent transport and drives the full
//! `Disconnected → Connecting → Syncing → Live` cycle: on every (re)open it
//! replaces the registry from the authoritative camera list, force-bumps all
//! image versions, and only then starts feeding live events to the store.
//! Connection loss schedules a reconnect after a fixed backoff; the resync
//! is cheap and bounded, so the delay is constant rather than exponential.

use crate::api::CameraDirectory;
use crate::error::{Result, WatchpostError};
use crate::events::Event;
use crate::store::SharedStore;
use crate::transport::{EventTransport, TransportSignal};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fixed delay between a connection loss and the next attempt.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Lifecycle of one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Syncing,
    Live,
}

/// How a connection attempt ended, when it ended without an error.
enum SessionEnd {
    /// The transport closed; the supervisor reconnects.
    Closed,
    /// Shutdown was requested; the supervisor stops.
    Cancelled,
}

/// Drives one store from one transport and one camera directory.
pub struct Supervisor<T, D> {
    store: SharedStore,
    transport: T,
    directory: D,
    retry_delay: Duration,
}

impl<T, D> Supervisor<T, D>
where
    T: EventTransport,
    D: CameraDirectory,
{
    #[must_use]
    pub fn new(store: SharedStore, transport: T, directory: D) -> Self {
        Self {
            store,
            transport,
            directory,
            retry_delay: RETRY_DELAY,
        }
    }

    /// Override the reconnect delay. Tests use this to keep reconnect
    /// round trips fast.
    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// The store this supervisor feeds.
    #[must_use]
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Run until cancelled.
    ///
    /// # Errors
    ///
    /// Only the very first connection's failure (handshake or full load) is
    /// propagated, so whoever initialized the dashboard learns it never came
    /// up. Once a full load has succeeded, every later failure is logged and
    /// retried in the background.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut synced_once = false;

        loop {
            match self.connect_once(&cancel, &mut synced_once).await {
                Ok(SessionEnd::Cancelled) => {
                    info!("Connection supervisor stopping");
                    return Ok(());
                }
                Ok(SessionEnd::Closed) => {}
                Err(e) if !synced_once => {
                    self.mark_disconnected();
                    return Err(e);
                }
                Err(e) => warn!("Resync failed: {e}; retrying"),
            }

            self.mark_disconnected();
            debug!("Reconnecting in {:?}", self.retry_delay);
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }

    async fn connect_once(
        &self,
        cancel: &CancellationToken,
        synced_once: &mut bool,
    ) -> Result<SessionEnd> {
        debug!(state = ?ConnectionState::Connecting, "Opening event transport");
        let mut signals = self.transport.open();

        // Connecting: wait for the open signal.
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
                signal = signals.recv() => match signal {
                    Some(TransportSignal::Open) => break,
                    Some(TransportSignal::Message(_)) => {
                        debug!("Ignoring message before the transport opened");
                    }
                    Some(TransportSignal::Closed) | None => {
                        return Err(WatchpostError::Connection(
                            "transport closed before opening".to_string(),
                        ));
                    }
                },
            }
        }

        // Syncing: authoritative full load. Events racing ahead of the load
        // are dropped, not buffered; the load supersedes them.
        debug!(state = ?ConnectionState::Syncing, "Transport open, fetching camera list");
        let load = self.directory.fetch_cameras();
        tokio::pin!(load);
        let summaries = loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
                result = &mut load => break result?,
                signal = signals.recv() => match signal {
                    Some(TransportSignal::Message(_)) => {
                        debug!("Dropping event received before the full load completed");
                    }
                    Some(TransportSignal::Open) => {}
                    Some(TransportSignal::Closed) | None => {
                        return Err(WatchpostError::Connection(
                            "transport closed during the full load".to_string(),
                        ));
                    }
                },
            }
        };

        match self.store.write() {
            Ok(mut store) => {
                store.load_cameras(summaries);
                store.force_update_all();
                store.set_connection_status(true);
            }
            Err(e) => {
                error!("Failed to acquire store write lock: {e}");
                return Err(WatchpostError::Generic("store lock poisoned".to_string()));
            }
        }
        *synced_once = true;
        info!(state = ?ConnectionState::Live, "Full load complete, processing live events");

        // Live: hand every message to the reducer, in receipt order.
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
                signal = signals.recv() => match signal {
                    Some(TransportSignal::Message(text)) => self.dispatch(&text),
                    Some(TransportSignal::Open) => {}
                    Some(TransportSignal::Closed) | None => {
                        info!("Event transport closed");
                        return Ok(SessionEnd::Closed);
                    }
                },
            }
        }
    }

    /// Decode one frame and apply it. One bad message must never take down
    /// the live view, so decode failures are logged and dropped.
    fn dispatch(&self, text: &str) {
        let event = match serde_json::from_str::<Event>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping malformed event: {e}");
                return;
            }
        };

        match self.store.write() {
            Ok(mut store) => store.apply_event(event),
            Err(e) => error!("Failed to acquire store write lock: {e}"),
        }
    }

    fn mark_disconnected(&self) {
        debug!(state = ?ConnectionState::Disconnected, "Connection lost");
        match self.store.write() {
            Ok(mut store) => store.set_connection_status(false),
            Err(e) => error!("Failed to acquire store write lock: {e}"),
        }
    }
}
