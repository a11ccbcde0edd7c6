// src/api.rs
//! HTTP control surface: health, stats, manual trigger.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::harvest::scheduler::Scheduler;
use crate::harvest::stats::StatsReporter;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub stats: StatsReporter,
    pub service_name: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/harvest", post(trigger_harvest))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": &*state.service_name,
        "health": "good",
    }))
}

async fn stats(State(state): State<AppState>) -> Response {
    match state.stats.stats().await {
        Ok(s) => Json(s).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "stats unavailable");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Fire-and-forget: completion shows up later in `/stats` as `last_cycle`.
async fn trigger_harvest(State(state): State<AppState>) -> Response {
    if state.scheduler.trigger_now() {
        Json(json!({ "status": "harvest started" })).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "shutting down" })),
        )
            .into_response()
    }
}
