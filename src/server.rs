//! HTTP endpoints: the listing read used by page rendering, the cache
//! revalidation hook, and the on-demand sync trigger.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::models::EventRecord;
use crate::pipeline::Pipeline;

pub type AppState = Arc<Pipeline>;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_events: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/revalidate", post(revalidate))
        .route("/api/sync", get(trigger_sync).post(trigger_sync))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config().listen_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("unable to bind {addr}"))?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .await
        .context("server stopped")
}

/// GET /api/events - canonical events for rendering
async fn list_events(State(state): State<AppState>) -> Json<Vec<EventRecord>> {
    Json(state.listing().await)
}

/// POST /api/revalidate - drop the cached listing
async fn revalidate(State(state): State<AppState>) -> Json<SyncResponse> {
    state.invalidate_listing();
    Json(SyncResponse {
        success: true,
        new_events: None,
        error: None,
    })
}

/// GET|POST /api/sync - run one scrape-merge-write cycle
async fn trigger_sync(State(state): State<AppState>) -> (StatusCode, Json<SyncResponse>) {
    match state.sync().await {
        Ok(report) => (
            StatusCode::OK,
            Json(SyncResponse {
                success: true,
                new_events: Some(report.new_events),
                error: None,
            }),
        ),
        Err(err) => {
            error!("sync cycle failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncResponse {
                    success: false,
                    new_events: None,
                    error: Some(err.to_string()),
                }),
            )
        }
    }
}
