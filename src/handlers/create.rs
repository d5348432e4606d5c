use crate::endpoint::EndpointInput;
use crate::error::{ApiError, ErrorResponse};
use crate::models::EndpointResponse;
use crate::reload::ChangeKind;
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// POST /admin/endpoints handler - Create a mock endpoint
///
/// On success the reload controller is notified. A failed reload signal is
/// reported in `reload_warning`; the definition stays created.
#[utoipa::path(
    post,
    path = routes::ADMIN_ENDPOINTS,
    request_body = EndpointInput,
    responses(
        (status = 201, description = "Endpoint created", body = EndpointResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "endpoints"
)]
pub async fn create_handler(
    State(state): State<AppState>,
    Json(input): Json<EndpointInput>,
) -> Result<(StatusCode, Json<EndpointResponse>), ApiError> {
    let endpoint = state.store.create(&input).await.inspect_err(|e| {
        if e.is_duplicate() {
            tracing::info!("Rejected duplicate endpoint: {}", e);
        }
    })?;
    tracing::info!(
        "Created endpoint {} {} (status {}, {} params) with id: {}",
        endpoint.verb,
        endpoint.pattern,
        endpoint.status,
        endpoint.params.len(),
        endpoint.id
    );

    let reload = state.reload.definition_changed(ChangeKind::Created).await.into();

    Ok((StatusCode::CREATED, Json(EndpointResponse { endpoint, reload })))
}
