// Request handlers for the built-in endpoints

use axum::{extract::State, response::Json};
use chrono::Utc;
use tracing::debug;

use crate::api::responses::{ApiError, HealthResponse, QueryRequest, QueryResponse};
use crate::api::AppState;

/// Health check handler
///
/// GET /health
///
/// Checked by the startup verifier before the process is considered up.
pub async fn health_handler(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: (Utc::now() - app_state.started_at).num_seconds(),
        fields: app_state.schema.fields().to_vec(),
    })
}

/// Field resolution handler
///
/// POST /query
/// Body: { "field": "...", "args": { ... } }
pub async fn query_handler(
    State(app_state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    debug!(field = %request.field, "Resolving query field");

    let data = app_state.schema.resolve(&request.field, &request.args)?;
    Ok(Json(QueryResponse { data }))
}
