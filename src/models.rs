use serde::{Deserialize, Serialize};

use crate::endpoint::EndpointDefinition;
use crate::reload::{ReloadOutcome, ReloadSignalError};

/// How the reload controller reacted to a mutation
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReloadReport {
    /// One of: skipped, restart_requested, swapped, failed
    pub reload: String,
    /// Set when the reload signal could not be delivered; the mutation itself succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_warning: Option<String>,
}

impl From<Result<ReloadOutcome, ReloadSignalError>> for ReloadReport {
    fn from(result: Result<ReloadOutcome, ReloadSignalError>) -> Self {
        match result {
            Ok(outcome) => ReloadReport {
                reload: outcome.as_str().to_string(),
                reload_warning: None,
            },
            Err(err) => ReloadReport {
                reload: "failed".to_string(),
                reload_warning: Some(err.to_string()),
            },
        }
    }
}

/// Response type for successful create and update operations
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct EndpointResponse {
    pub endpoint: EndpointDefinition,
    #[serde(flatten)]
    pub reload: ReloadReport,
}

/// Response type for successful delete operations
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    pub id: String,
    pub message: String,
    #[serde(flatten)]
    pub reload: ReloadReport,
}

/// Response type for list endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListResponse {
    pub data: Vec<EndpointDefinition>,
    pub total_count: usize,
}
