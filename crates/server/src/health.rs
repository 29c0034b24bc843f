use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use t3ext_core::source::ExtensionSource;

#[derive(Clone)]
pub struct HealthState {
    source: Arc<dyn ExtensionSource>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceCheck {
    pub name: &'static str,
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub source: SourceCheck,
    pub checked_at: String,
}

pub fn router(source: Arc<dyn ExtensionSource>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { source })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let source = match state.source.ready().await {
        Ok(()) => SourceCheck {
            name: state.source.name(),
            status: "ready",
            detail: "data source reachable".to_string(),
        },
        Err(error) => SourceCheck {
            name: state.source.name(),
            status: "degraded",
            detail: format!("data source check failed: {error}"),
        },
    };
    let ready = source.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        source,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
