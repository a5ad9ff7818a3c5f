//! Repositories: typed persistence operations over a write scope
//!
//! Every call acquires one [`WriteScope`] from the repository's
//! [`ScopeFactory`], begins a transaction, commits on success or rolls back
//! on failure, and closes the scope exactly once.

pub mod pipeline;

use crate::core::entity::Entity;
use crate::core::error::{EntityError, FrameworkError, FrameworkResult, StorageError};
use crate::core::field::FieldValue;
use crate::persistence::function::resolve_query_functions;
use crate::persistence::scope::{RecordSpec, ScopeFactory, WriteError, WriteScope};
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

pub use pipeline::{
    FieldAction, FieldOutcome, PostValues, PreResolution, SaveReport, SkipReason, WritePath,
    merge_or_persist, post_resolve, pre_resolve,
};

/// Persistence operations for one entity type
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Fetch by identifier; `NotFound` when absent
    async fn get(&self, id: &FieldValue) -> FrameworkResult<T>;

    /// Page through every record; `max == 0` is unbounded, empty is `NotFound`
    async fn list_all(&self, first: usize, max: usize) -> FrameworkResult<Vec<T>>;

    /// Run a query after resolving its functions; empty is `NotFound`
    async fn query(&self, query: &str, first: usize, max: usize) -> FrameworkResult<Vec<T>>;

    /// First record matching `query`
    async fn query_single_result(&self, query: &str) -> FrameworkResult<T> {
        self.query(query, 0, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EntityError::NotFound {
                    entity_type: T::entity_name().to_string(),
                    id: String::new(),
                }
                .into()
            })
    }

    /// Save through the field resolution pipeline, updating `entity` in place
    async fn save_or_update(&self, entity: &mut T) -> FrameworkResult<SaveReport<T>>;

    async fn delete(&self, entity: &T) -> FrameworkResult<()>;

    /// Delete every record matching `query`, returning the affected count
    async fn query_delete(&self, query: &str) -> FrameworkResult<u64>;
}

/// Repository for any [`Entity`] over a [`ScopeFactory`]
pub struct GenericRepository<T> {
    factory: Arc<dyn ScopeFactory>,
    spec: RecordSpec,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> GenericRepository<T> {
    pub fn new(factory: Arc<dyn ScopeFactory>) -> Self {
        Self {
            factory,
            spec: RecordSpec::from_descriptor(&T::describe()),
            _entity: PhantomData,
        }
    }

    pub fn record_spec(&self) -> &RecordSpec {
        &self.spec
    }

    async fn open(&self) -> FrameworkResult<Box<dyn WriteScope>> {
        let mut scope = self.factory.acquire().await.map_err(|e| {
            tracing::error!(entity = T::entity_name(), error = %e, "Couldn't acquire a write scope");
            FrameworkError::Storage(StorageError::Unavailable {
                backend: e.to_string(),
            })
        })?;
        if let Err(e) = scope.begin().await {
            scope.close().await;
            tracing::error!(entity = T::entity_name(), error = %e, "Couldn't begin the transaction");
            return Err(StorageError::TransactionError {
                message: e.to_string(),
            }
            .into());
        }
        Ok(scope)
    }

    /// Commit or roll back according to `result`, then close the scope
    async fn finish<R: Send>(
        &self,
        mut scope: Box<dyn WriteScope>,
        operation: &str,
        result: Result<R, WriteError>,
    ) -> FrameworkResult<R> {
        let outcome = match result {
            Ok(value) => scope.commit().await.map(|()| value),
            Err(e) => Err(e),
        };
        if outcome.is_err() {
            if let Err(e) = scope.rollback().await {
                tracing::warn!(entity = T::entity_name(), error = %e, "Couldn't roll back the transaction");
            }
        }
        scope.close().await;

        outcome.map_err(|e| {
            let err = FrameworkError::from_write(T::entity_name(), operation, e);
            tracing::error!(entity = T::entity_name(), operation, "{}", err);
            err
        })
    }

    fn decode(record: Value) -> FrameworkResult<T> {
        serde_json::from_value(record).map_err(|e| {
            EntityError::SerializationError {
                entity_type: T::entity_name().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn decode_all(records: Vec<Value>) -> FrameworkResult<Vec<T>> {
        let entities = records
            .into_iter()
            .map(Self::decode)
            .collect::<FrameworkResult<Vec<T>>>()?;
        if entities.is_empty() {
            return Err(EntityError::NotFound {
                entity_type: T::entity_name().to_string(),
                id: String::new(),
            }
            .into());
        }
        Ok(entities)
    }
}

impl<T> Clone for GenericRepository<T> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            spec: self.spec.clone(),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for GenericRepository<T> {
    async fn get(&self, id: &FieldValue) -> FrameworkResult<T> {
        let mut scope = self.open().await?;
        let result = scope.find(&self.spec, id).await;
        match self.finish(scope, "get", result).await? {
            Some(record) => Self::decode(record),
            None => Err(EntityError::NotFound {
                entity_type: T::entity_name().to_string(),
                id: id.to_string(),
            }
            .into()),
        }
    }

    async fn list_all(&self, first: usize, max: usize) -> FrameworkResult<Vec<T>> {
        let mut scope = self.open().await?;
        let result = scope.query(&self.spec, "*", first, max).await;
        let records = self.finish(scope, "list", result).await?;
        Self::decode_all(records)
    }

    async fn query(&self, query: &str, first: usize, max: usize) -> FrameworkResult<Vec<T>> {
        let resolved = resolve_query_functions(query, &T::describe());
        let mut scope = self.open().await?;
        let result = scope.query(&self.spec, &resolved, first, max).await;
        let records = self.finish(scope, "query", result).await?;
        Self::decode_all(records)
    }

    async fn save_or_update(&self, entity: &mut T) -> FrameworkResult<SaveReport<T>> {
        let mut scope = self.open().await?;
        let result = merge_or_persist(scope.as_mut(), &self.spec, entity).await;
        let report = self.finish(scope, "save", result).await?;
        tracing::debug!(
            entity = T::entity_name(),
            path = ?report.path,
            "Saved entity"
        );
        Ok(report)
    }

    async fn delete(&self, entity: &T) -> FrameworkResult<()> {
        let id = entity.id_value();
        let mut scope = self.open().await?;
        let result = scope.remove(&self.spec, &id).await;
        if self.finish(scope, "delete", result).await? {
            Ok(())
        } else {
            Err(EntityError::NotFound {
                entity_type: T::entity_name().to_string(),
                id: id.to_string(),
            }
            .into())
        }
    }

    async fn query_delete(&self, query: &str) -> FrameworkResult<u64> {
        let resolved = resolve_query_functions(query, &T::describe());
        let mut scope = self.open().await?;
        let result = scope.execute_delete(&self.spec, &resolved).await;
        self.finish(scope, "delete", result).await
    }
}
