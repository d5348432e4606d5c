use crate::error::{HealthResponse, UnhealthyResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// GET /admin/health handler - Health check endpoint
///
/// Verifies store connectivity and reports where the reload controller
/// stands. Returns 200 OK if the store is reachable, 503 Service Unavailable
/// otherwise.
#[utoipa::path(
    get,
    path = routes::ADMIN_HEALTH,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = UnhealthyResponse)
    ),
    tag = "health"
)]
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<HealthResponse>), (StatusCode, Json<UnhealthyResponse>)> {
    match state.store.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            let table = state.reload.table();
            Ok((
                StatusCode::OK,
                Json(HealthResponse {
                    status: "healthy".to_string(),
                    store: state.store.backend_name().to_string(),
                    reload_strategy: state.config.reload_strategy.as_str().to_string(),
                    reload_state: state.reload.state().as_str().to_string(),
                    routes: table.len(),
                    skipped_duplicates: table.skipped_duplicates(),
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(UnhealthyResponse {
                    status: "unhealthy".to_string(),
                    error: format!("Cannot connect to database: {}", e),
                }),
            ))
        }
    }
}
