//! Round-robin camera refresh scheduler.
//!
//! Walks the configured cameras in a fixed rotation, one camera per tick:
//! announce `loading`, fetch a fresh snapshot from the camera's source URL,
//! then broadcast `update` or `error` depending on the outcome. A failing
//! camera keeps its slot and is simply retried one full rotation later; its
//! consecutive-failure counter travels with every `error` event. Powered-off
//! cameras are skipped.

use crate::error::Result;
use crate::events::Event;
use crate::server::AppState;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const SNAPSHOT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Reloader {
    state: Arc<AppState>,
    client: reqwest::Client,
    interval: Duration,
}

impl Reloader {
    #[must_use]
    pub fn new(state: Arc<AppState>, interval: Duration) -> Self {
        Self {
            state,
            client: reqwest::Client::new(),
            interval,
        }
    }

    /// Refresh one camera per interval tick until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        info!("Starting camera reload scheduler");
        let mut timer = tokio::time::interval(self.interval);
        let mut position = 0usize;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Reload scheduler stopping");
                    return;
                }
                _ = timer.tick() => self.reload_next(&mut position).await,
            }
        }
    }

    async fn reload_next(&self, position: &mut usize) {
        let Some((uuid, source_url)) = self.next_target(position) else {
            return;
        };
        debug!("Refreshing camera {uuid}");
        self.state.broadcast(Event::Loading {
            uuid: uuid.clone(),
            value: true,
        });

        match self.fetch_snapshot(&source_url).await {
            Ok(image) => {
                let path = self.state.snapshot_dir.join(format!("{uuid}.jpg"));
                match tokio::fs::write(&path, &image).await {
                    Ok(()) => self.record_success(&uuid),
                    Err(e) => self.record_failure(&uuid, format!("failed to store snapshot: {e}")),
                }
            }
            Err(e) => self.record_failure(&uuid, e.to_string()),
        }

        self.state.broadcast(Event::Loading {
            uuid,
            value: false,
        });
    }

    /// Next camera in rotation that is not powered off, or `None` when there
    /// is nothing to refresh.
    fn next_target(&self, position: &mut usize) -> Option<(String, String)> {
        let cameras = match self.state.cameras.read() {
            Ok(cameras) => cameras,
            Err(e) => {
                warn!("Failed to acquire camera read lock: {e}");
                return None;
            }
        };
        if cameras.is_empty() {
            return None;
        }

        for _ in 0..cameras.len() {
            let index = *position % cameras.len();
            *position = (*position + 1) % cameras.len();
            let camera = &cameras[index];
            if !camera.powered_off {
                return Some((camera.uuid.clone(), camera.source_url.clone()));
            }
        }
        None
    }

    async fn fetch_snapshot(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .timeout(SNAPSHOT_FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    fn record_success(&self, uuid: &str) {
        let now = Utc::now();
        match self.state.cameras.write() {
            Ok(mut cameras) => {
                if let Some(camera) = cameras.iter_mut().find(|camera| camera.uuid == uuid) {
                    camera.failure_counter = 0;
                    camera.last_updated = Some(now);
                }
            }
            Err(e) => {
                warn!("Failed to acquire camera write lock: {e}");
                return;
            }
        }
        debug!("Camera {uuid} refreshed");
        self.state.broadcast(Event::Update {
            uuid: uuid.to_string(),
            failure_counter: 0,
            time: now.timestamp_millis(),
        });
    }

    fn record_failure(&self, uuid: &str, message: String) {
        let now = Utc::now();
        let failure_counter = match self.state.cameras.write() {
            Ok(mut cameras) => match cameras.iter_mut().find(|camera| camera.uuid == uuid) {
                Some(camera) => {
                    camera.failure_counter += 1;
                    camera.failure_counter
                }
                None => return,
            },
            Err(e) => {
                warn!("Failed to acquire camera write lock: {e}");
                return;
            }
        };
        warn!("Camera {uuid} refresh failed ({failure_counter} in a row): {message}");
        self.state.broadcast(Event::Error {
            uuid: uuid.to_string(),
            message,
            failure_counter,
            time: now.timestamp_millis(),
        });
    }
}

/// Periodic clock sync for connected dashboards. The `time` event carries
/// the server's epoch milliseconds and doubles as a keepalive frame.
pub async fn run_time_sync(state: Arc<AppState>, period: Duration, cancel: CancellationToken) {
    let mut timer = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = timer.tick() => {
                state.broadcast(Event::Time {
                    value: Utc::now().timestamp_millis(),
                });
            }
        }
    }
}
