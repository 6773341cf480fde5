//! Abstract event transport and its WebSocket implementation.
//!
//! The sync engine only needs the three completion signals a persistent
//! connection can produce: it opened, a message arrived, it closed. Anything
//! that can deliver those through a channel can drive the supervisor, which
//! is what the scripted transports in the tests do.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Completion signals of one connection attempt, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// The connection is established; messages may follow.
    Open,
    /// One raw text frame from the server.
    Message(String),
    /// The connection is gone, whether it ever opened or not. Always the
    /// last signal of an attempt.
    Closed,
}

/// A persistent connection factory the supervisor can reopen at will.
pub trait EventTransport {
    /// Begin a single connection attempt. Signals for this attempt arrive on
    /// the returned receiver; the attempt ends with [`TransportSignal::Closed`]
    /// or by the receiver being dropped.
    fn open(&self) -> mpsc::Receiver<TransportSignal>;
}

/// Derive the WebSocket `/events` URL from a dashboard's base HTTP URL.
///
/// # Errors
///
/// Returns an error if the base URL does not parse or uses a scheme that
/// cannot carry a WebSocket connection.
pub fn events_url(base_url: &str) -> crate::error::Result<String> {
    let mut url = url::Url::parse(base_url).map_err(|e| {
        crate::error::WatchpostError::Generic(format!("Invalid dashboard URL {base_url}: {e}"))
    })?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(crate::error::WatchpostError::Generic(format!(
                "Unsupported dashboard URL scheme: {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| crate::error::WatchpostError::from("Failed to derive WebSocket URL"))?;
    url.set_path("/events");
    Ok(url.to_string())
}

/// WebSocket transport for the `/events` endpoint.
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl EventTransport for WsTransport {
    fn open(&self) -> mpsc::Receiver<TransportSignal> {
        let (tx, rx) = mpsc::channel(64);
        let url = self.url.clone();

        tokio::spawn(async move {
            let ws = match connect_async(&url).await {
                Ok((ws, _response)) => ws,
                Err(e) => {
                    warn!("Event connection to {url} failed: {e}");
                    let _ = tx.send(TransportSignal::Closed).await;
                    return;
                }
            };
            debug!("Event connection to {url} established");
            if tx.send(TransportSignal::Open).await.is_err() {
                return;
            }

            let (_write, mut read) = ws.split();
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if tx.send(TransportSignal::Message(text)).await.is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Event connection errored: {e}");
                        break;
                    }
                }
            }
            let _ = tx.send(TransportSignal::Closed).await;
        });

        rx
    }
}
