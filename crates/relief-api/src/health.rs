use axum::{Json, extract::State};
use relief_types::api::HealthResponse;

use crate::auth::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.clone();
    let database = tokio::task::spawn_blocking(move || db.health_check().is_ok())
        .await
        .unwrap_or(false);

    Json(HealthResponse {
        status: if database { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: chrono::Utc::now(),
    })
}
