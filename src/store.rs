use thiserror::Error;

use crate::endpoint::{EndpointDefinition, EndpointInput, FieldError};
use crate::memory::MemoryStore;
use crate::spanner::SpannerStore;

/// Errors surfaced by endpoint store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// One or more fields were rejected; nothing was written
    #[error("validation failed: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// No definition with this id
    #[error("endpoint not found: {0}")]
    NotFound(String),

    /// The backing store could not complete the operation
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Validation(errors) if errors.iter().any(FieldError::is_duplicate))
    }
}

/// Endpoint definition store, backed by Spanner or by process memory
#[derive(Clone)]
pub enum Store {
    Spanner(SpannerStore),
    Memory(MemoryStore),
}

impl Store {
    /// All definitions, in the store's stable iteration order
    pub async fn list(&self) -> Result<Vec<EndpointDefinition>, StoreError> {
        match self {
            Store::Spanner(store) => store.list().await,
            Store::Memory(store) => store.list(),
        }
    }

    pub async fn get(&self, id: &str) -> Result<EndpointDefinition, StoreError> {
        match self {
            Store::Spanner(store) => store.get(id).await,
            Store::Memory(store) => store.get(id),
        }
    }

    pub async fn create(&self, input: &EndpointInput) -> Result<EndpointDefinition, StoreError> {
        match self {
            Store::Spanner(store) => store.create(input).await,
            Store::Memory(store) => store.create(input),
        }
    }

    pub async fn update(&self, id: &str, input: &EndpointInput) -> Result<EndpointDefinition, StoreError> {
        match self {
            Store::Spanner(store) => store.update(id, input).await,
            Store::Memory(store) => store.update(id, input),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self {
            Store::Spanner(store) => store.delete(id).await,
            Store::Memory(store) => store.delete(id),
        }
    }

    pub async fn health_check(&self) -> anyhow::Result<()> {
        match self {
            Store::Spanner(store) => store.health_check().await,
            Store::Memory(_) => Ok(()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Spanner(_) => "spanner",
            Store::Memory(_) => "memory",
        }
    }
}
