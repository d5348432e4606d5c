use crate::endpoint::EndpointInput;
use crate::error::{ApiError, ErrorResponse};
use crate::handlers::parse_id;
use crate::models::EndpointResponse;
use crate::reload::ChangeKind;
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode, Json};

/// PUT /admin/endpoints/{id} handler - Partially update a mock endpoint
///
/// Only the supplied fields change. `params` is replaced only when at least
/// one non-blank name is submitted.
#[utoipa::path(
    put,
    path = routes::ADMIN_ENDPOINT,
    params(
        ("id" = String, Path, description = "UUID of the endpoint definition")
    ),
    request_body = EndpointInput,
    responses(
        (status = 200, description = "Endpoint updated", body = EndpointResponse),
        (status = 400, description = "Invalid id format", body = ErrorResponse),
        (status = 404, description = "Endpoint not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "endpoints"
)]
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    Json(input): Json<EndpointInput>,
) -> Result<(StatusCode, Json<EndpointResponse>), ApiError> {
    let id = parse_id(&id_str)?;

    let endpoint = state.store.update(&id, &input).await.inspect_err(|e| {
        if e.is_duplicate() {
            tracing::info!("Rejected update of {} onto a taken verb and pattern: {}", id, e);
        }
    })?;
    tracing::info!("Updated endpoint {} {} with id: {}", endpoint.verb, endpoint.pattern, id);

    let reload = state.reload.definition_changed(ChangeKind::Updated).await.into();

    Ok((StatusCode::OK, Json(EndpointResponse { endpoint, reload })))
}
