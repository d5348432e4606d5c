use crate::error::{ApiError, ErrorResponse};
use crate::handlers::parse_id;
use crate::models::DeleteResponse;
use crate::reload::ChangeKind;
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode, Json};

/// DELETE /admin/endpoints/{id} handler - Remove a mock endpoint
///
/// Unless RELOAD_ON_DELETE is set, the route stays live in the current
/// process until the next restart.
#[utoipa::path(
    delete,
    path = routes::ADMIN_ENDPOINT,
    params(
        ("id" = String, Path, description = "UUID of the endpoint definition")
    ),
    responses(
        (status = 200, description = "Endpoint deleted", body = DeleteResponse),
        (status = 400, description = "Invalid id format", body = ErrorResponse),
        (status = 404, description = "Endpoint not found", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "endpoints"
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<(StatusCode, Json<DeleteResponse>), ApiError> {
    let id = parse_id(&id_str)?;

    state.store.delete(&id).await?;
    tracing::info!("Deleted endpoint with id: {}", id);

    let reload = state.reload.definition_changed(ChangeKind::Deleted).await.into();

    Ok((
        StatusCode::OK,
        Json(DeleteResponse {
            id,
            message: "Endpoint deleted".to_string(),
            reload,
        }),
    ))
}
