use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::error::ApiError;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// Liveness plus a database round-trip. 503 when the ping fails.
pub async fn get_health(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    state.store.ping().await.map_err(|err| {
        tracing::warn!(target_uri = %state.store.target(), error = %err, "Database ping failed");
        ApiError::from(err)
    })?;

    Ok(Json(HealthStatus {
        status: "ok",
        database: "up",
        version: env!("CARGO_PKG_VERSION"),
    }))
}
