//! Health check HTTP handler

use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};

use crate::web::{AppState, responses::HealthResponse};

/// Liveness plus uptime, truncated to whole seconds
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = Utc::now();
    let uptime = (now - state.start_time).to_std().unwrap_or_default();
    let uptime = std::time::Duration::from_secs(uptime.as_secs());

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime: humantime::format_duration(uptime).to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}
