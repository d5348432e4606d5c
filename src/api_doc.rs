use utoipa::OpenApi;

use crate::endpoint::{EndpointDefinition, EndpointInput, FieldError, Verb};
use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{DeleteResponse, EndpointResponse, ListResponse, ReloadReport};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "mock-endpoint-server admin API",
        version = "1.0.0",
        description = "Define canned HTTP endpoints; every request outside /admin is answered from them"
    ),
    paths(
        handlers::health::health_handler,
        handlers::list::list_handler,
        handlers::create::create_handler,
        handlers::get::get_handler,
        handlers::update::update_handler,
        handlers::delete::delete_handler
    ),
    components(
        schemas(
            Verb,
            EndpointDefinition,
            EndpointInput,
            FieldError,
            EndpointResponse,
            DeleteResponse,
            ListResponse,
            ReloadReport,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "endpoints", description = "Mock endpoint definitions")
    )
)]
pub struct ApiDoc;
