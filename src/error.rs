use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::endpoint::FieldError;
use crate::store::StoreError;

/// Error response type
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Rejected fields, present for validation failures
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub reload_strategy: String,
    pub reload_state: String,
    pub routes: usize,
    /// Definitions left out of the live table because their (verb, pattern) was taken
    pub skipped_duplicates: usize,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// Maps store and dispatch failures to HTTP status codes and formats them
/// as JSON `ErrorResponse` bodies.
#[derive(Debug)]
pub enum ApiError {
    /// Path id is not a UUID
    InvalidId(String),
    /// Create/update rejected by validation
    Validation(Vec<FieldError>),
    /// No definition with this id
    EndpointNotFound(String),
    /// No mock endpoint answers this request
    NoRoute { method: String, path: String },
    /// Database operation error
    DatabaseError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            ApiError::InvalidId(id) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid endpoint id: expected a UUID like '550e8400-e29b-41d4-a716-446655440000', got '{}'", id),
                Vec::new(),
            ),
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Endpoint definition rejected".to_string(),
                errors,
            ),
            ApiError::EndpointNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Endpoint not found: {}", id),
                Vec::new(),
            ),
            ApiError::NoRoute { method, path } => (
                StatusCode::NOT_FOUND,
                format!("No mock endpoint for {} {}", method, path),
                Vec::new(),
            ),
            ApiError::DatabaseError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {:#}", err),
                Vec::new(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(errors) => ApiError::Validation(errors),
            StoreError::NotFound(id) => ApiError::EndpointNotFound(id),
            StoreError::Backend(err) => ApiError::DatabaseError(err),
        }
    }
}
