// Route path constants - single source of truth for all admin API paths

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::handlers::{
    create_handler, delete_handler, dispatch_handler, get_handler, health_handler, list_handler,
    update_handler,
};
use crate::state::AppState;

pub const ADMIN_HEALTH: &str = "/admin/health";
pub const ADMIN_ENDPOINTS: &str = "/admin/endpoints";
pub const ADMIN_ENDPOINT: &str = "/admin/endpoints/{id}";
pub const ADMIN_SWAGGER_UI: &str = "/admin/swagger-ui";
pub const ADMIN_OPENAPI: &str = "/admin/api-docs/openapi.json";

/// Admin API plus the mock dispatcher as fallback, so admin paths always win
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(ADMIN_HEALTH, get(health_handler))
        .route(ADMIN_ENDPOINTS, get(list_handler).post(create_handler))
        .route(
            ADMIN_ENDPOINT,
            get(get_handler).put(update_handler).delete(delete_handler),
        )
        .merge(SwaggerUi::new(ADMIN_SWAGGER_UI).url(ADMIN_OPENAPI, ApiDoc::openapi()))
        .fallback(dispatch_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
