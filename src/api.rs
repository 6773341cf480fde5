//! HTTP client for the server's camera endpoints.
//!
//! Covers the two requests the sync engine makes outside the event stream:
//! the authoritative camera-list fetch performed after every transport open,
//! and the fire-and-forget powered-off command.

use crate::error::Result;
use crate::events::{CameraSummary, PoweredOffRequest};
use std::future::Future;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of the authoritative camera list and target for camera commands.
pub trait CameraDirectory {
    /// Read all cameras. Called once per (re)connect; the result replaces
    /// the registry wholesale.
    fn fetch_cameras(&self) -> impl Future<Output = Result<Vec<CameraSummary>>> + Send;

    /// Request a camera's powered-off state to change. Fire-and-forget: the
    /// authoritative change arrives later as a `poweredOff` event, not via
    /// this request's response.
    fn set_powered_off(&self, uuid: &str, value: bool) -> impl Future<Output = Result<()>> + Send;
}

/// [`CameraDirectory`] backed by the dashboard server's HTTP API.
pub struct HttpDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDirectory {
    /// A directory rooted at `base_url`, e.g. `http://127.0.0.1:3000`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

impl CameraDirectory for HttpDirectory {
    async fn fetch_cameras(&self) -> Result<Vec<CameraSummary>> {
        let url = format!("{}/cameras", self.base_url);
        tracing::debug!("Fetching authoritative camera list from {url}");

        let cameras = self
            .client
            .get(&url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CameraSummary>>()
            .await?;

        tracing::debug!("Camera list fetch returned {} cameras", cameras.len());
        Ok(cameras)
    }

    async fn set_powered_off(&self, uuid: &str, value: bool) -> Result<()> {
        let url = format!("{}/cameras/{uuid}/poweredOff", self.base_url);
        self.client
            .put(&url)
            .timeout(FETCH_TIMEOUT)
            .json(&PoweredOffRequest { value })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
