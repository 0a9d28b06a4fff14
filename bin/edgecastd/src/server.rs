use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use bytes::Bytes;
use edgecast::{BroadcastFile, Gateway};

const TRANSFER_ID_HEADER: &str = "x-transfer-id";

pub fn create_router(gateway: Arc<Gateway>, ingest: bool) -> Router {
    let mut app = Router::new()
        .route("/api/status", get(status))
        .route("/{*path}", get(serve_item));
    if ingest {
        app = app.route("/ingest/{*content_location}", put(ingest_file));
    }
    app.with_state(gateway)
}

async fn status(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    Json(gateway.status())
}

async fn serve_item(
    State(gateway): State<Arc<Gateway>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let cache = gateway.cache();
    let item = query
        .and_then(|query| cache.get(&format!("{path}?{query}")))
        .or_else(|| cache.get(&path));
    let Some(item) = item else {
        tracing::debug!("{path} is not cached");
        return StatusCode::NOT_FOUND.into_response();
    };

    match item.read().await {
        Ok(body) => ([(header::CONTENT_TYPE, content_type(&path))], body).into_response(),
        Err(e) => {
            tracing::warn!("Failed to load {path}: {e}");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

async fn ingest_file(
    State(gateway): State<Arc<Gateway>>,
    Path(content_location): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let transfer_id = headers
        .get(TRANSFER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let file = BroadcastFile::new(content_location, transfer_id, content_type, body);
    match gateway.deliver(file) {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            tracing::warn!("Failed to process ingested file: {e}");
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

fn content_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("mpd") => "application/dash+xml",
        Some("ts") => "video/mp2t",
        Some("m4s" | "mp4") => "video/mp4",
        Some("aac") => "audio/aac",
        _ => "application/octet-stream",
    }
}
