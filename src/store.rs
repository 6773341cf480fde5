use crate::clock::ClockCorrector;
use crate::events::{CameraSummary, Event};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Maximum number of notifications retained in the log.
pub const MAX_NOTIFICATION_COUNT: usize = 50;

/// Current state of a single camera as known to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraRecord {
    /// Opaque identifier, unique, never reused.
    pub uuid: String,
    /// Monotonically non-decreasing counter the rendering layer uses for
    /// cache busting. Never reset downward.
    pub image_version: u64,
    /// Server time of the last successful refresh, if any.
    pub last_updated: Option<DateTime<Utc>>,
    /// Last error message, or `None` while the camera is healthy.
    pub error: Option<String>,
    /// Consecutive-failure count as reported by the server.
    pub failure_counter: u32,
    /// True while a refresh is in flight upstream.
    pub loading: bool,
    /// Powered-off cameras never generate notifications.
    pub is_powered_off: bool,
}

impl CameraRecord {
    fn from_summary(summary: CameraSummary) -> Self {
        let last_updated = summary
            .last_updated
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        Self {
            uuid: summary.uuid,
            image_version: 0,
            last_updated,
            error: None,
            failure_counter: 0,
            loading: false,
            is_powered_off: false,
        }
    }
}

/// A user-visible record of a camera problem.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// The camera this notification refers to.
    pub camera_uuid: String,
    pub message: String,
    pub time: DateTime<Utc>,
    pub unread: bool,
}

/// The state container behind the dashboard.
///
/// Holds the camera registry, the bounded notification log, the connection
/// status and the clock corrector. All business rules for incoming events
/// live in [`DashboardStore::apply_event`]; the rendering layer only reads.
///
/// The registry is `None` until the first full load completes. Readers must
/// treat that as "loading", never as "no cameras".
#[derive(Debug, Default)]
pub struct DashboardStore {
    cameras: Option<Vec<CameraRecord>>,
    max_image_version: u64,
    notifications: VecDeque<Notification>,
    connected: Option<bool>,
    clock: ClockCorrector,
}

/// Shared handle used by the supervisor (writer) and the rendering layer
/// (readers). Critical sections are short and never cross an await point.
pub type SharedStore = Arc<RwLock<DashboardStore>>;

impl DashboardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh store behind the shared handle.
    #[must_use]
    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// The camera registry, or `None` before the first full load.
    #[must_use]
    pub fn cameras(&self) -> Option<&[CameraRecord]> {
        self.cameras.as_deref()
    }

    /// Point lookup by uuid.
    #[must_use]
    pub fn camera(&self, uuid: &str) -> Option<&CameraRecord> {
        self.cameras
            .as_ref()?
            .iter()
            .find(|camera| camera.uuid == uuid)
    }

    /// Notifications, oldest first.
    #[must_use]
    pub fn notifications(&self) -> &VecDeque<Notification> {
        &self.notifications
    }

    /// Count of unread notifications, recomputed on demand.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| n.unread).count()
    }

    /// `None` until the first transport outcome is known.
    #[must_use]
    pub fn connection_status(&self) -> Option<bool> {
        self.connected
    }

    pub fn set_connection_status(&mut self, connected: bool) {
        self.connected = Some(connected);
    }

    /// Highest image version ever observed across all cameras.
    #[must_use]
    pub fn max_image_version(&self) -> u64 {
        self.max_image_version
    }

    /// Current time as corrected by the last `time` event.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The clock corrector itself, for readers that format timestamps.
    #[must_use]
    pub fn clock(&self) -> &ClockCorrector {
        &self.clock
    }

    /// Replace the registry wholesale from an authoritative camera list.
    ///
    /// Must be called after every successful transport (re)open, before any
    /// mutation event is considered valid, and must be followed immediately
    /// by [`DashboardStore::force_update_all`].
    pub fn load_cameras(&mut self, summaries: Vec<CameraSummary>) {
        self.cameras = Some(
            summaries
                .into_iter()
                .map(CameraRecord::from_summary)
                .collect(),
        );
    }

    /// Bump `max_image_version` once and assign it to every camera, so a
    /// reconnect never displays an image older than what was shown before
    /// the disconnect.
    pub fn force_update_all(&mut self) {
        self.max_image_version += 1;
        if let Some(cameras) = self.cameras.as_mut() {
            for camera in cameras {
                camera.image_version = self.max_image_version;
            }
        }
    }

    /// Apply `fn` to the camera with the given uuid, in place.
    ///
    /// Returns `None` without touching anything when the registry is not
    /// loaded yet or the uuid is unknown. Events referencing cameras the
    /// registry does not know are a benign race with the full load and are
    /// simply dropped.
    pub fn modify_camera<F>(&mut self, uuid: &str, apply: F) -> Option<&mut CameraRecord>
    where
        F: FnOnce(&mut CameraRecord),
    {
        let camera = self
            .cameras
            .as_mut()?
            .iter_mut()
            .find(|camera| camera.uuid == uuid)?;
        apply(camera);
        Some(camera)
    }

    /// Route one decoded event to its mutation. Events are handled exactly
    /// once, in arrival order.
    pub fn apply_event(&mut self, event: Event) {
        match event {
            Event::Update {
                uuid,
                failure_counter,
                time,
            } => self.update_camera(&uuid, failure_counter, time),
            Event::Loading { uuid, value } => self.set_loading(&uuid, value),
            Event::Error {
                uuid,
                message,
                failure_counter,
                time,
            } => self.set_camera_error(&uuid, &message, failure_counter, time),
            Event::PoweredOff { uuid, powered_off } => self.set_powered_off(&uuid, powered_off),
            Event::Time { value } => self.clock.correct(value),
            Event::Unknown => {
                tracing::debug!("Ignoring event of unknown type");
            }
        }
    }

    /// A refresh succeeded: clear the error, advance the image version and
    /// stamp the refresh time.
    pub fn update_camera(&mut self, uuid: &str, failure_counter: u32, time_millis: i64) {
        let time = server_time(time_millis);
        let new_version = self.modify_camera(uuid, |camera| {
            camera.error = None;
            camera.failure_counter = failure_counter;
            camera.image_version += 1;
            camera.last_updated = time;
        });
        if let Some(camera) = new_version {
            let version = camera.image_version;
            self.max_image_version = self.max_image_version.max(version);
        }
    }

    /// A refresh failed: store the error and, unless the camera is powered
    /// off, log a notification for it.
    pub fn set_camera_error(
        &mut self,
        uuid: &str,
        message: &str,
        failure_counter: u32,
        time_millis: i64,
    ) {
        let time = server_time(time_millis);
        let suppressed = match self.modify_camera(uuid, |camera| {
            camera.error = Some(message.to_string());
            camera.failure_counter = failure_counter;
            camera.last_updated = time;
        }) {
            Some(camera) => camera.is_powered_off,
            None => return,
        };

        if !suppressed {
            self.push_notification(uuid, message, time.unwrap_or_else(Utc::now));
        }
    }

    pub fn set_loading(&mut self, uuid: &str, value: bool) {
        self.modify_camera(uuid, |camera| camera.loading = value);
    }

    pub fn set_powered_off(&mut self, uuid: &str, value: bool) {
        self.modify_camera(uuid, |camera| camera.is_powered_off = value);
    }

    /// Flip the powered-off flag locally and report the new value, so the
    /// caller can send the matching command to the server. The authoritative
    /// state change still arrives later as a `poweredOff` event.
    pub fn toggle_powered_off(&mut self, uuid: &str) -> Option<bool> {
        self.modify_camera(uuid, |camera| {
            camera.is_powered_off = !camera.is_powered_off;
        })
        .map(|camera| camera.is_powered_off)
    }

    fn push_notification(&mut self, camera_uuid: &str, message: &str, time: DateTime<Utc>) {
        self.notifications.push_back(Notification {
            camera_uuid: camera_uuid.to_string(),
            message: message.to_string(),
            time,
            unread: true,
        });
        while self.notifications.len() > MAX_NOTIFICATION_COUNT {
            self.notifications.pop_front();
        }
    }

    /// Mark every notification read. Driven by the rendering layer when the
    /// log is opened.
    pub fn mark_notifications_read(&mut self) {
        for notification in &mut self.notifications {
            notification.unread = false;
        }
    }
}

fn server_time(epoch_millis: i64) -> Option<DateTime<Utc>> {
    let time = Utc.timestamp_millis_opt(epoch_millis).single();
    if time.is_none() {
        tracing::warn!("Dropping out-of-range event timestamp: {epoch_millis}");
    }
    time
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(uuid: &str, last_updated: Option<i64>) -> CameraSummary {
        CameraSummary {
            uuid: uuid.to_string(),
            last_updated,
        }
    }

    fn loaded_store(uuids: &[&str]) -> DashboardStore {
        let mut store = DashboardStore::new();
        store.load_cameras(uuids.iter().map(|uuid| summary(uuid, None)).collect());
        store.force_update_all();
        store
    }

    #[test]
    fn test_registry_is_unpopulated_before_first_load() {
        let store = DashboardStore::new();
        assert!(store.cameras().is_none());
        assert!(store.camera("cam1").is_none());
        assert_eq!(store.connection_status(), None);
    }

    #[test]
    fn test_load_converts_last_updated_epoch_seconds() {
        let mut store = DashboardStore::new();
        store.load_cameras(vec![
            summary("cam1", Some(1_600_000_000)),
            summary("cam2", None),
        ]);

        let cam1 = store.camera("cam1").expect("cam1 should be loaded");
        assert_eq!(
            cam1.last_updated,
            Utc.timestamp_opt(1_600_000_000, 0).single()
        );
        let cam2 = store.camera("cam2").expect("cam2 should be loaded");
        assert!(cam2.last_updated.is_none());
    }

    #[test]
    fn test_load_replaces_registry_wholesale() {
        let mut store = loaded_store(&["cam1", "cam2"]);
        store.set_powered_off("cam1", true);

        store.load_cameras(vec![summary("cam2", None), summary("cam3", None)]);
        assert!(store.camera("cam1").is_none());
        // Per-camera flags do not survive a full load; a poweredOff event
        // re-establishes them.
        assert!(!store.camera("cam2").unwrap().is_powered_off);
        assert!(store.camera("cam3").is_some());
    }

    #[test]
    fn test_force_update_all_assigns_version_above_previous_max() {
        let mut store = loaded_store(&["cam1", "cam2"]);
        let before = store.max_image_version();

        store.force_update_all();
        assert_eq!(store.max_image_version(), before + 1);
        for camera in store.cameras().unwrap() {
            assert_eq!(camera.image_version, before + 1);
        }
    }

    // Scenario A: update clears the error, bumps the version by one and
    // stamps the corrected refresh time.
    #[test]
    fn test_update_event_refreshes_camera() {
        let mut store = loaded_store(&["cam1"]);
        let version_before = store.camera("cam1").unwrap().image_version;

        store.apply_event(Event::Update {
            uuid: "cam1".to_string(),
            failure_counter: 0,
            time: 1000,
        });

        let cam1 = store.camera("cam1").unwrap();
        assert!(cam1.error.is_none());
        assert_eq!(cam1.image_version, version_before + 1);
        assert_eq!(cam1.failure_counter, 0);
        assert_eq!(cam1.last_updated, Utc.timestamp_millis_opt(1000).single());
        assert_eq!(store.max_image_version(), version_before + 1);
    }

    #[test]
    fn test_image_version_never_decreases() {
        let mut store = loaded_store(&["cam1"]);
        let mut last = store.camera("cam1").unwrap().image_version;

        for round in 0..20 {
            store.apply_event(Event::Update {
                uuid: "cam1".to_string(),
                failure_counter: 0,
                time: 1000 + round,
            });
            let version = store.camera("cam1").unwrap().image_version;
            assert!(version >= last);
            last = version;
        }

        // A reconnect resync must not go backwards either.
        store.load_cameras(vec![summary("cam1", None)]);
        store.force_update_all();
        assert!(store.camera("cam1").unwrap().image_version >= last);
    }

    // Scenario B: an error event stores the message and logs a notification.
    #[test]
    fn test_error_event_records_and_notifies() {
        let mut store = loaded_store(&["cam1"]);

        store.apply_event(Event::Error {
            uuid: "cam1".to_string(),
            message: "timeout".to_string(),
            failure_counter: 3,
            time: 2000,
        });

        let cam1 = store.camera("cam1").unwrap();
        assert_eq!(cam1.error.as_deref(), Some("timeout"));
        assert_eq!(cam1.failure_counter, 3);
        assert_eq!(cam1.last_updated, Utc.timestamp_millis_opt(2000).single());

        assert_eq!(store.notifications().len(), 1);
        let notification = store.notifications().front().unwrap();
        assert_eq!(notification.camera_uuid, "cam1");
        assert_eq!(notification.message, "timeout");
        assert!(notification.unread);
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_error_event_on_powered_off_camera_is_not_notified() {
        let mut store = loaded_store(&["cam1"]);
        store.apply_event(Event::PoweredOff {
            uuid: "cam1".to_string(),
            powered_off: true,
        });

        store.apply_event(Event::Error {
            uuid: "cam1".to_string(),
            message: "no signal".to_string(),
            failure_counter: 1,
            time: 2000,
        });

        // The record is still updated, only the notification is suppressed.
        let cam1 = store.camera("cam1").unwrap();
        assert_eq!(cam1.error.as_deref(), Some("no signal"));
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn test_events_for_unknown_uuid_are_silently_dropped() {
        let mut store = loaded_store(&["cam1"]);
        let version_before = store.camera("cam1").unwrap().image_version;
        let max_before = store.max_image_version();

        store.apply_event(Event::Update {
            uuid: "ghost".to_string(),
            failure_counter: 0,
            time: 1000,
        });
        store.apply_event(Event::Error {
            uuid: "ghost".to_string(),
            message: "boom".to_string(),
            failure_counter: 1,
            time: 1000,
        });
        store.apply_event(Event::Loading {
            uuid: "ghost".to_string(),
            value: true,
        });

        assert_eq!(store.camera("cam1").unwrap().image_version, version_before);
        assert_eq!(store.max_image_version(), max_before);
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn test_events_before_first_load_are_dropped() {
        let mut store = DashboardStore::new();
        store.apply_event(Event::Update {
            uuid: "cam1".to_string(),
            failure_counter: 0,
            time: 1000,
        });
        assert!(store.cameras().is_none());
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn test_loading_event_does_not_bump_version() {
        let mut store = loaded_store(&["cam1"]);
        let version_before = store.camera("cam1").unwrap().image_version;

        store.apply_event(Event::Loading {
            uuid: "cam1".to_string(),
            value: true,
        });
        let cam1 = store.camera("cam1").unwrap();
        assert!(cam1.loading);
        assert_eq!(cam1.image_version, version_before);

        store.apply_event(Event::Loading {
            uuid: "cam1".to_string(),
            value: false,
        });
        assert!(!store.camera("cam1").unwrap().loading);
    }

    // Scenario D: 60 errors leave exactly the 50 most recent notifications.
    #[test]
    fn test_notification_log_is_capped_fifo() {
        let mut store = loaded_store(&["cam1"]);

        for n in 1..=60 {
            store.apply_event(Event::Error {
                uuid: "cam1".to_string(),
                message: format!("failure #{n}"),
                failure_counter: n,
                time: i64::from(n) * 1000,
            });
        }

        assert_eq!(store.notifications().len(), MAX_NOTIFICATION_COUNT);
        let messages: Vec<&str> = store
            .notifications()
            .iter()
            .map(|n| n.message.as_str())
            .collect();
        assert_eq!(messages.first(), Some(&"failure #11"));
        assert_eq!(messages.last(), Some(&"failure #60"));
        // Original relative order is preserved.
        for (index, message) in messages.iter().enumerate() {
            assert_eq!(*message, format!("failure #{}", index + 11));
        }
    }

    #[test]
    fn test_unread_count_recomputes_after_marking_read() {
        let mut store = loaded_store(&["cam1"]);
        for n in 0..3 {
            store.apply_event(Event::Error {
                uuid: "cam1".to_string(),
                message: "offline".to_string(),
                failure_counter: n,
                time: 1000,
            });
        }
        assert_eq!(store.unread_count(), 3);

        store.mark_notifications_read();
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.notifications().len(), 3);
    }

    #[test]
    fn test_powered_off_event_targets_the_camera_record() {
        let mut store = loaded_store(&["cam1", "cam2"]);
        store.apply_event(Event::PoweredOff {
            uuid: "cam2".to_string(),
            powered_off: true,
        });

        assert!(!store.camera("cam1").unwrap().is_powered_off);
        assert!(store.camera("cam2").unwrap().is_powered_off);
    }

    #[test]
    fn test_toggle_powered_off_reports_new_value() {
        let mut store = loaded_store(&["cam1"]);
        assert_eq!(store.toggle_powered_off("cam1"), Some(true));
        assert_eq!(store.toggle_powered_off("cam1"), Some(false));
        assert_eq!(store.toggle_powered_off("ghost"), None);
    }

    #[test]
    fn test_time_event_feeds_the_clock_corrector() {
        let mut store = loaded_store(&["cam1"]);
        let server_now = Utc::now().timestamp_millis() + 10_000;
        store.apply_event(Event::Time { value: server_now });

        assert!((store.clock().offset_millis() - 10_000).abs() < 200);
        // No camera is touched by a time event.
        assert!(store.camera("cam1").unwrap().last_updated.is_none());
    }

    #[test]
    fn test_unknown_event_is_a_no_op() {
        let mut store = loaded_store(&["cam1"]);
        let max_before = store.max_image_version();
        store.apply_event(Event::Unknown);
        assert_eq!(store.max_image_version(), max_before);
        assert!(store.notifications().is_empty());
    }

    // Scenario C lives in tests/sync_engine_test.rs where a reconnect is
    // driven through the supervisor; the store-level half is covered by
    // test_force_update_all_assigns_version_above_previous_max.
}
