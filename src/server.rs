//! HTTP surface: the progress event stream plus the thin upload and read
//! routes the tracker UI talks to.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, StreamExt};
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::ingest::{parse_sheet, IngestPipeline};
use crate::platform::Platform;
use crate::progress::ProgressHub;
use crate::scrape::ProfileFetcher;
use crate::store::ProfileStore;

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub hub: ProgressHub,
    pub fetcher: Arc<ProfileFetcher>,
    pub store: Arc<ProfileStore>,
    /// Serializes ingestion runs — the roster store assumes one writer.
    pub ingest_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(hub: ProgressHub, fetcher: Arc<ProfileFetcher>, store: Arc<ProfileStore>) -> Self {
        Self {
            hub,
            fetcher,
            store,
            ingest_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/logs/stream", get(stream_logs))
        .route("/api/bulk-upload", post(bulk_upload))
        .route("/api/profiles/{platform}", get(list_profiles))
        .route("/api/profiles/{platform}/refresh", post(refresh_platform))
        .route("/api/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// SSE log stream: replay the hub backlog, then forward live events.
async fn stream_logs(State(state): State<AppState>) -> impl IntoResponse {
    let (backlog, rx) = state.hub.subscribe();

    let replay = stream::iter(backlog).map(|event| {
        Ok::<_, Infallible>(Event::default().data(
            serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string()),
        ))
    });

    let live = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => Some(Ok::<_, Infallible>(Event::default().data(
                serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string()),
            ))),
            // A lagged observer just skips what it missed.
            Err(_) => None,
        }
    });

    Sse::new(replay.chain(live)).keep_alive(KeepAlive::default())
}

/// Run the ingestion pipeline over an uploaded CSV roster, then replace the
/// persisted roster wholesale.
async fn bulk_upload(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let _guard = state.ingest_lock.lock().await;

    let rows = match parse_sheet(&body) {
        Ok(rows) => rows,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()})));
        }
    };

    let pipeline = IngestPipeline::new(&state.fetcher, &state.hub);
    let outcome = match pipeline.ingest(&rows).await {
        Ok(outcome) => outcome,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()})));
        }
    };

    if let Err(e) = state.store.save(&outcome.roster).await {
        error!(error = %e, "Failed to persist ingested roster");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "failed to save roster"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "message": "Upload successful",
            "total": outcome.roster.total(),
            "counts": {
                "leetcode": outcome.roster.leetcode.len(),
                "codechef": outcome.roster.codechef.len(),
                "geeksforgeeks": outcome.roster.geeksforgeeks.len(),
            },
            "rowErrors": outcome.row_errors,
        })),
    )
}

/// Sequentially re-fetch every stored profile on one platform, replace
/// that platform's list, and return it.
async fn refresh_platform(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> impl IntoResponse {
    let Ok(platform) = platform.parse::<Platform>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid platform"})),
        );
    };
    let _guard = state.ingest_lock.lock().await;

    let mut roster = state.store.load().await;
    let pipeline = IngestPipeline::new(&state.fetcher, &state.hub);
    let updated = pipeline.refresh(platform, roster.platform(platform)).await;
    *roster.platform_mut(platform) = updated;

    if let Err(e) = state.store.save(&roster).await {
        error!(error = %e, "Failed to persist refreshed roster");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "failed to save roster"})),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::to_value(roster.platform(platform)).unwrap_or_default()),
    )
}

async fn list_profiles(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> impl IntoResponse {
    let Ok(platform) = platform.parse::<Platform>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid platform"})),
        );
    };
    let roster = state.store.load().await;
    (
        StatusCode::OK,
        Json(serde_json::to_value(roster.platform(platform)).unwrap_or_default()),
    )
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let roster = state.store.load().await;
    Json(json!({
        "total": roster.total(),
        "platforms": {
            "leetcode": roster.leetcode.len(),
            "codechef": roster.codechef.len(),
            "geeksforgeeks": roster.geeksforgeeks.len(),
        }
    }))
}
