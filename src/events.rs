//! Wire format shared by the event feed and the camera list endpoint.
//!
//! Events are small JSON objects tagged by a `type` field, pushed over the
//! persistent `/events` connection. The server serializes them, the sync
//! engine deserializes them; both sides use the same enum so the two can
//! never drift apart.

use serde::{Deserialize, Serialize};

/// A single status event for one camera, or a global clock correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// A camera refresh completed successfully.
    #[serde(rename_all = "camelCase")]
    Update {
        uuid: String,
        failure_counter: u32,
        /// Server time of the refresh, epoch milliseconds.
        time: i64,
    },
    /// A camera refresh started or finished upstream.
    Loading { uuid: String, value: bool },
    /// A camera refresh failed.
    #[serde(rename_all = "camelCase")]
    Error {
        uuid: String,
        message: String,
        failure_counter: u32,
        /// Server time of the failure, epoch milliseconds.
        time: i64,
    },
    /// A camera was switched on or off.
    #[serde(rename_all = "camelCase")]
    PoweredOff { uuid: String, powered_off: bool },
    /// Clock sync: the server's current time, epoch milliseconds.
    Time { value: i64 },
    /// Any `type` this build does not know about. Ignored by the reducer so
    /// newer servers can add event kinds without breaking older dashboards.
    #[serde(other)]
    Unknown,
}

/// One entry of the authoritative camera list served by `GET /cameras`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSummary {
    pub uuid: String,
    /// Server time of the last successful refresh, epoch seconds, or null if
    /// the camera has never been refreshed.
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<i64>,
}

/// Body of `PUT /cameras/:uuid/poweredOff`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoweredOffRequest {
    pub value: bool,
}
