use crate::endpoint::EndpointDefinition;
use crate::error::{ApiError, ErrorResponse};
use crate::handlers::parse_id;
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, extract::Path, http::StatusCode, Json};

/// GET /admin/endpoints/{id} handler - Retrieve one stored definition
#[utoipa::path(
    get,
    path = routes::ADMIN_ENDPOINT,
    params(
        ("id" = String, Path, description = "UUID of the endpoint definition")
    ),
    responses(
        (status = 200, description = "Endpoint found", body = EndpointDefinition),
        (status = 400, description = "Invalid id format", body = ErrorResponse),
        (status = 404, description = "Endpoint not found", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "endpoints"
)]
pub async fn get_handler(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<(StatusCode, Json<EndpointDefinition>), ApiError> {
    let id = parse_id(&id_str)?;

    let endpoint = state.store.get(&id).await?;
    tracing::debug!("Retrieved endpoint with id: {}", id);

    Ok((StatusCode::OK, Json(endpoint)))
}
