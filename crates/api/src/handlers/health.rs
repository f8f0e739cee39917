//! Health check handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    database: &'static str,
}

/// GET /health
///
/// Returns 200 with database connectivity status.
pub async fn health(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let database = match mailroom_db::health_check(&state.pool).await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::error!(error = %err, "Database health check failed");
            "unreachable"
        }
    };

    Ok(Json(HealthReport {
        status: "ok",
        database,
    }))
}
