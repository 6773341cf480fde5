use crate::server::AppState;
use askama_axum::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use chrono::Utc;
use std::sync::Arc;

// Template structure for the dashboard shell
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    site_name: String,
    rendered_at: String,
    cameras: Vec<CameraTile>,
}

struct CameraTile {
    uuid: String,
    name: String,
}

/// Generates the dashboard page from the current camera set
pub async fn generate_index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Generating index template");

    let cameras = match state.cameras.read() {
        Ok(cameras) => cameras
            .iter()
            .map(|camera| CameraTile {
                uuid: camera.uuid.clone(),
                name: camera.name.clone(),
            })
            .collect(),
        Err(_) => {
            tracing::error!("Camera state read lock error");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Camera state read lock error")
                .into_response();
        }
    };

    let template = IndexTemplate {
        site_name: state.site_name.clone(),
        rendered_at: Utc::now().format("%H:%M UTC").to_string(),
        cameras,
    };
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template rendering error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Template rendering error",
            )
                .into_response()
        }
    }
}
