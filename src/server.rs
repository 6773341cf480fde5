use crate::config::Config;
use crate::error::Result;
use crate::events::{CameraSummary, Event, PoweredOffRequest};
use crate::index::generate_index;
use crate::reloader::{run_time_sync, Reloader};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

/// Server-side record of one configured camera.
#[derive(Debug, Clone)]
pub struct ServerCamera {
    pub uuid: String,
    pub name: String,
    pub source_url: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub failure_counter: u32,
    pub powered_off: bool,
}

/// Shared state for the dashboard server: the camera set, the snapshot
/// directory and the broadcast channel every `/events` subscriber hangs off.
pub struct AppState {
    pub site_name: String,
    pub snapshot_dir: PathBuf,
    pub cameras: RwLock<Vec<ServerCamera>>,
    pub events: broadcast::Sender<Event>,
}

impl AppState {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let (events, _) = broadcast::channel(256);
        let cameras = config
            .cameras
            .iter()
            .map(|camera| ServerCamera {
                uuid: camera.uuid.clone(),
                name: camera.name.clone(),
                source_url: camera.source_url.clone(),
                last_updated: None,
                failure_counter: 0,
                powered_off: false,
            })
            .collect();
        Self {
            site_name: config.site_name.clone(),
            snapshot_dir: config.snapshot_dir.clone(),
            cameras: RwLock::new(cameras),
            events,
        }
    }

    /// Push one event to every connected dashboard. Having no subscribers is
    /// not an error.
    pub fn broadcast(&self, event: Event) {
        debug!("Broadcasting event: {event:?}");
        let _ = self.events.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

/// Run the dashboard server on the specified port.
///
/// Spawns the reload scheduler (unless disabled) and the clock sync task,
/// then serves until the cancellation token fires.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the snapshot
/// directory cannot be created, or the server fails to bind or run.
pub async fn run(
    port: u16,
    config_path: Option<PathBuf>,
    cancel: CancellationToken,
) -> Result<()> {
    tracing::info!("Initializing server");

    let config_path = config_path.unwrap_or_else(|| PathBuf::from(crate::config::CONFIG_FILE));
    let config = Config::load(&config_path)?;

    tokio::fs::create_dir_all(&config.snapshot_dir).await?;

    let state = Arc::new(AppState::from_config(&config));

    tokio::spawn(run_time_sync(
        state.clone(),
        Duration::from_secs(config.time_sync_interval_secs),
        cancel.clone(),
    ));

    if config.no_reload {
        info!("Reload scheduler disabled by configuration");
    } else {
        let reloader = Reloader::new(
            state.clone(),
            Duration::from_secs(config.reload_interval_secs),
        );
        tokio::spawn(reloader.run(cancel.clone()));
    }

    let app = Router::new()
        .route("/", get(generate_index))
        .route("/cameras", get(list_cameras))
        .route("/cameras/:uuid/poweredOff", put(set_powered_off))
        .route("/events", get(events_ws))
        .nest_service("/snapshots", ServeDir::new(&config.snapshot_dir))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state);

    debug!("Routes configured");

    let addr = format!("0.0.0.0:{port}");
    info!("Binding server to address: {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Dashboard launched on: http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// `GET /cameras`: the authoritative camera list.
///
/// `lastUpdated` crosses the wire as epoch seconds or null, matching what
/// the sync engine's full load expects.
pub async fn list_cameras(State(state): State<Arc<AppState>>) -> Response {
    let cameras = match state.cameras.read() {
        Ok(cameras) => cameras
            .iter()
            .map(|camera| CameraSummary {
                uuid: camera.uuid.clone(),
                last_updated: camera.last_updated.map(|time| time.timestamp()),
            })
            .collect::<Vec<_>>(),
        Err(_) => {
            error!("Camera state read lock error");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Camera state read lock error")
                .into_response();
        }
    };
    Json(cameras).into_response()
}

/// `PUT /cameras/:uuid/poweredOff`: toggle a camera's power state.
///
/// The response carries no state; the authoritative change is broadcast as a
/// `poweredOff` event to every subscriber, including whoever sent this.
pub async fn set_powered_off(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
    Json(payload): Json<PoweredOffRequest>,
) -> Response {
    let found = match state.cameras.write() {
        Ok(mut cameras) => match cameras.iter_mut().find(|camera| camera.uuid == uuid) {
            Some(camera) => {
                camera.powered_off = payload.value;
                true
            }
            None => false,
        },
        Err(_) => {
            error!("Camera state write lock error");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Camera state write lock error")
                .into_response();
        }
    };

    if !found {
        return (StatusCode::NOT_FOUND, "Unknown camera").into_response();
    }

    info!("Camera {uuid} powered off set to {}", payload.value);
    state.broadcast(Event::PoweredOff {
        uuid,
        powered_off: payload.value,
    });
    StatusCode::OK.into_response()
}

/// `GET /events`: upgrade to the persistent event feed.
pub async fn events_ws(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_event_socket(socket, state))
}

/// Forward every broadcast event to one subscriber until either side goes
/// away. Laggy subscribers lose messages, which is safe: their next full
/// load is authoritative.
async fn handle_event_socket(socket: WebSocket, state: Arc<AppState>) {
    debug!("Event subscriber connected");
    let (mut sender, mut receiver) = socket.split();
    let mut updates = BroadcastStream::new(state.subscribe());

    loop {
        tokio::select! {
            update = updates.next() => match update {
                Some(Ok(event)) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to serialize event: {e}"),
                },
                Some(Err(BroadcastStreamRecvError::Lagged(count))) => {
                    warn!("Event subscriber lagged, dropped {count} messages");
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket receive error: {e}");
                    break;
                }
            },
        }
    }
    debug!("Event subscriber disconnected");
}
