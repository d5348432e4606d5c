use anyhow::anyhow;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::endpoint::{EndpointDefinition, EndpointInput, FieldError, ValidFields};
use crate::store::StoreError;

/// In-process endpoint store.
///
/// Every write runs its uniqueness check and its mutation under one write
/// guard, so concurrent writers of the same (verb, pattern) see exactly one
/// winner. Iteration order is insertion order. Contents do not survive a
/// restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Vec<EndpointDefinition>>>,
}

impl MemoryStore {
    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<EndpointDefinition>>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend(anyhow!("memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<EndpointDefinition>>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend(anyhow!("memory store lock poisoned")))
    }

    pub fn list(&self) -> Result<Vec<EndpointDefinition>, StoreError> {
        Ok(self.read()?.clone())
    }

    pub fn get(&self, id: &str) -> Result<EndpointDefinition, StoreError> {
        self.read()?
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn create(&self, input: &EndpointInput) -> Result<EndpointDefinition, StoreError> {
        let fields = input.normalize().for_create().map_err(StoreError::Validation)?;

        let mut definitions = self.write()?;
        ensure_unique(&definitions, &fields, None)?;

        let definition = fields.into_definition(Uuid::new_v4().to_string());
        definitions.push(definition.clone());

        tracing::debug!("Inserted endpoint {} {} with id: {}", definition.verb, definition.pattern, definition.id);
        Ok(definition)
    }

    pub fn update(&self, id: &str, input: &EndpointInput) -> Result<EndpointDefinition, StoreError> {
        let mut definitions = self.write()?;
        let index = definitions
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let fields = input
            .normalize()
            .merge_into(&definitions[index])
            .map_err(StoreError::Validation)?;
        ensure_unique(&definitions, &fields, Some(id))?;

        let definition = fields.into_definition(id.to_string());
        definitions[index] = definition.clone();

        tracing::debug!("Updated endpoint with id: {}", id);
        Ok(definition)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut definitions = self.write()?;
        let index = definitions
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        definitions.remove(index);

        tracing::debug!("Deleted endpoint with id: {}", id);
        Ok(())
    }
}

fn ensure_unique(
    definitions: &[EndpointDefinition],
    fields: &ValidFields,
    own_id: Option<&str>,
) -> Result<(), StoreError> {
    let taken = definitions.iter().any(|d| {
        d.verb == fields.verb && d.pattern == fields.pattern && Some(d.id.as_str()) != own_id
    });
    if taken {
        return Err(StoreError::Validation(vec![FieldError::duplicate(
            fields.verb,
            &fields.pattern,
        )]));
    }
    Ok(())
}
