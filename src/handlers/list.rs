use crate::error::{ApiError, ErrorResponse};
use crate::models::ListResponse;
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// GET /admin/endpoints handler - List all stored definitions
///
/// Returns definitions in store iteration order, which is also the order
/// the route table compiler sees them in.
#[utoipa::path(
    get,
    path = routes::ADMIN_ENDPOINTS,
    responses(
        (status = 200, description = "All endpoint definitions", body = ListResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "endpoints"
)]
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ListResponse>), ApiError> {
    let data = state.store.list().await?;

    let response = ListResponse {
        total_count: data.len(),
        data,
    };

    tracing::info!("Listed {} endpoints", response.total_count);

    Ok((StatusCode::OK, Json(response)))
}
