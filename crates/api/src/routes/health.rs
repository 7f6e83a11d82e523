//! Health and probe endpoints.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
    /// Outbound notification e-mail is switched on.
    pub email_enabled: bool,
    /// Office time zone used for due dates and notification days.
    pub time_zone: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
}

/// Round-trip time of a trivial query, `None` when the store is unreachable.
async fn database_latency(state: &AppState) -> Option<u64> {
    let started = Instant::now();
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .ok()
        .map(|_| started.elapsed().as_millis() as u64)
}

/// GET /api/health
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let latency_ms = database_latency(&state).await;
    if latency_ms.is_none() {
        tracing::warn!("Health check failed: database unreachable");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        database: DatabaseHealth {
            connected: true,
            latency_ms,
        },
        email_enabled: state.config.email.enabled,
        time_zone: state.config.google.time_zone.clone(),
    }))
}

/// GET /api/health/live
pub async fn live() -> Json<ProbeResponse> {
    Json(ProbeResponse { status: "alive" })
}

/// GET /api/health/ready
pub async fn ready(State(state): State<AppState>) -> Result<Json<ProbeResponse>, StatusCode> {
    match database_latency(&state).await {
        Some(_) => Ok(Json(ProbeResponse { status: "ready" })),
        None => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.9.0",
            database: DatabaseHealth {
                connected: true,
                latency_ms: Some(5),
            },
            email_enabled: false,
            time_zone: "Asia/Tokyo".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"]["latency_ms"], 5);
        assert_eq!(json["time_zone"], "Asia/Tokyo");
    }
}
