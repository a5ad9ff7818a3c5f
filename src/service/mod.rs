//! Service layer delegating entity operations to a repository

use crate::core::entity::Entity;
use crate::core::error::FrameworkResult;
use crate::core::field::FieldValue;
use crate::repository::Repository;
use async_trait::async_trait;
use std::sync::Arc;

/// Business operations for one entity type
///
/// The error kinds of the repository pass through unchanged, so callers can
/// still tell a conflict from a missing record.
#[async_trait]
pub trait Service<T: Entity>: Send + Sync {
    /// Save a new entity, returning it with generated values applied
    async fn add(&self, entity: T) -> FrameworkResult<T>;

    /// Save changes to an existing entity
    async fn alter(&self, entity: T) -> FrameworkResult<T>;

    async fn remove(&self, entity: &T) -> FrameworkResult<()>;

    async fn get(&self, id: &FieldValue) -> FrameworkResult<T>;

    /// Page through every entity; `max == 0` is unbounded
    async fn list_all(&self, first: usize, max: usize) -> FrameworkResult<Vec<T>>;

    async fn query(&self, query: &str, first: usize, max: usize) -> FrameworkResult<Vec<T>>;
}

/// [`Service`] over any [`Repository`]
pub struct GenericService<T> {
    repository: Arc<dyn Repository<T>>,
}

impl<T: Entity> GenericService<T> {
    pub fn new(repository: Arc<dyn Repository<T>>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn Repository<T>> {
        &self.repository
    }
}

impl<T> Clone for GenericService<T> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
        }
    }
}

#[async_trait]
impl<T: Entity> Service<T> for GenericService<T> {
    async fn add(&self, mut entity: T) -> FrameworkResult<T> {
        self.repository.save_or_update(&mut entity).await?;
        tracing::info!(entity = T::entity_name(), id = %entity.id_value(), "Added entity");
        Ok(entity)
    }

    async fn alter(&self, mut entity: T) -> FrameworkResult<T> {
        self.repository.save_or_update(&mut entity).await?;
        tracing::info!(entity = T::entity_name(), id = %entity.id_value(), "Altered entity");
        Ok(entity)
    }

    async fn remove(&self, entity: &T) -> FrameworkResult<()> {
        self.repository.delete(entity).await?;
        tracing::info!(entity = T::entity_name(), id = %entity.id_value(), "Removed entity");
        Ok(())
    }

    async fn get(&self, id: &FieldValue) -> FrameworkResult<T> {
        self.repository.get(id).await
    }

    async fn list_all(&self, first: usize, max: usize) -> FrameworkResult<Vec<T>> {
        self.repository.list_all(first, max).await
    }

    async fn query(&self, query: &str, first: usize, max: usize) -> FrameworkResult<Vec<T>> {
        self.repository.query(query, first, max).await
    }
}
