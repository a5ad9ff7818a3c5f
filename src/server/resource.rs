//! REST resource exposing one entity type through its service

use crate::core::auth::{AccessGuard, AccessPolicy, AuthContext, Operation};
use crate::core::entity::Entity;
use crate::core::error::{FrameworkError, FrameworkResult, RequestError};
use crate::core::field::FieldValue;
use crate::schema::descriptor::TypeRef;
use crate::schema::{Schema, SchemaGenerator};
use crate::server::access::{OperationAccess, enforce_access};
use crate::server::entity_registry::EntityDescriptor;
use crate::service::Service;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::middleware;
use axum::routing::{MethodRouter, delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Paging and filtering parameters of the list route
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub first: usize,
    /// 0 means unbounded
    #[serde(default)]
    pub max: usize,
    /// Query text, run instead of listing everything
    pub q: Option<String>,
}

/// REST routes of an entity backed by a [`Service`]
pub struct EntityResource<T: Entity> {
    service: Arc<dyn Service<T>>,
    singular: String,
    plural: String,
    access: AccessPolicy,
}

impl<T: Entity> EntityResource<T> {
    /// Expose `T` under its own resource names
    pub fn new(service: Arc<dyn Service<T>>) -> Self {
        Self {
            service,
            singular: T::resource_name_singular().to_string(),
            plural: T::resource_name().to_string(),
            access: AccessPolicy::free(),
        }
    }

    /// Override the route prefix
    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self
    }

    /// Require access levels on the routes
    pub fn with_access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    pub fn access(&self) -> &AccessPolicy {
        &self.access
    }

    fn guarded(
        &self,
        route: MethodRouter<ResourceState<T>>,
        operation: Operation,
        guard: Option<&AccessGuard>,
    ) -> MethodRouter<ResourceState<T>> {
        let access = OperationAccess {
            guard: guard.cloned(),
            required: self.access.resolve(operation),
            resource: Arc::from(self.plural.as_str()),
            operation,
        };
        route.route_layer(middleware::from_fn_with_state(access, enforce_access))
    }
}

struct ResourceState<T: Entity> {
    service: Arc<dyn Service<T>>,
    plural: Arc<str>,
}

impl<T: Entity> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            plural: self.plural.clone(),
        }
    }
}

impl<T: Entity> EntityDescriptor for EntityResource<T> {
    fn entity_type(&self) -> &str {
        &self.singular
    }

    fn plural(&self) -> &str {
        &self.plural
    }

    fn is_guarded(&self) -> bool {
        !self.access.is_free()
    }

    fn build_routes(&self, guard: Option<&AccessGuard>) -> Router {
        let state = ResourceState {
            service: self.service.clone(),
            plural: Arc::from(self.plural.as_str()),
        };

        Router::new()
            .route(
                &format!("/{}", self.plural),
                self.guarded(get(list_entities::<T>), Operation::List, guard)
                    .merge(self.guarded(post(create_entity::<T>), Operation::Create, guard)),
            )
            .route(
                &format!("/{}/schema", self.plural),
                self.guarded(get(entity_schema::<T>), Operation::Schema, guard),
            )
            .route(
                &format!("/{}/{{id}}", self.plural),
                self.guarded(get(get_entity::<T>), Operation::Get, guard)
                    .merge(self.guarded(put(update_entity::<T>), Operation::Update, guard))
                    .merge(self.guarded(delete(delete_entity::<T>), Operation::Delete, guard)),
            )
            .with_state(state)
    }
}

/// Parse a path identifier according to the declared identifier type
pub fn parse_id<T: Entity>(raw: &str) -> FrameworkResult<FieldValue> {
    let invalid = || FrameworkError::from(RequestError::InvalidEntityId { id: raw.to_string() });
    match T::describe().identifier().map(|attribute| attribute.ty) {
        Some(TypeRef::Number(_)) => raw.parse::<i64>().map(FieldValue::Integer).map_err(|_| invalid()),
        Some(TypeRef::Opaque(name)) if name.ends_with("Uuid") => {
            Uuid::parse_str(raw).map(FieldValue::Uuid).map_err(|_| invalid())
        }
        _ if raw.trim().is_empty() => Err(invalid()),
        _ => Ok(FieldValue::String(raw.to_string())),
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> FrameworkResult<T> {
    payload.map(|Json(entity)| entity).map_err(|rejection| {
        RequestError::InvalidBody {
            message: rejection.body_text(),
        }
        .into()
    })
}

async fn list_entities<T: Entity>(
    State(state): State<ResourceState<T>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> FrameworkResult<Json<Vec<T>>> {
    let Query(params) = params.map_err(|rejection| RequestError::InvalidQuery {
        message: rejection.body_text(),
    })?;
    let result = match params.q.as_deref() {
        Some(query) => state.service.query(query, params.first, params.max).await,
        None => state.service.list_all(params.first, params.max).await,
    };
    match result {
        Ok(entities) => Ok(Json(entities)),
        Err(e) if e.is_not_found() => Ok(Json(Vec::new())),
        Err(e) => Err(e),
    }
}

async fn entity_schema<T: Entity>() -> FrameworkResult<Json<Schema>> {
    let schema = SchemaGenerator::new().generate_for::<T>()?;
    Ok(Json(schema))
}

async fn get_entity<T: Entity>(
    State(state): State<ResourceState<T>>,
    Path(id): Path<String>,
) -> FrameworkResult<Json<T>> {
    let id = parse_id::<T>(&id)?;
    Ok(Json(state.service.get(&id).await?))
}

async fn create_entity<T: Entity>(
    State(state): State<ResourceState<T>>,
    caller: AuthContext,
    payload: Result<Json<T>, JsonRejection>,
) -> FrameworkResult<Response> {
    let entity = body(payload)?;
    tracing::debug!(entity = T::entity_name(), level = %caller.level(), "Creating");
    let saved = state.service.add(entity).await?;
    let location = format!("/{}/{}", state.plural, saved.id_value());
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(saved)).into_response())
}

async fn update_entity<T: Entity>(
    State(state): State<ResourceState<T>>,
    Path(id): Path<String>,
    caller: AuthContext,
    payload: Result<Json<T>, JsonRejection>,
) -> FrameworkResult<StatusCode> {
    let id = parse_id::<T>(&id)?;
    tracing::debug!(entity = T::entity_name(), %id, level = %caller.level(), "Updating");
    let mut entity = body(payload)?;
    let existent = state.service.get(&id).await?;

    let descriptor = T::describe();
    if let Some(identifier) = descriptor.identifier() {
        entity.set_field_value(identifier.name, id)?;
    }
    if let Some(version) = descriptor.version_attribute() {
        if entity.field_value(version.name)?.is_null() {
            entity.set_field_value(version.name, existent.field_value(version.name)?)?;
        }
    }

    state.service.alter(entity).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_entity<T: Entity>(
    State(state): State<ResourceState<T>>,
    Path(id): Path<String>,
    caller: AuthContext,
) -> FrameworkResult<StatusCode> {
    let id = parse_id::<T>(&id)?;
    tracing::debug!(entity = T::entity_name(), %id, level = %caller.level(), "Deleting");
    let existent = state.service.get(&id).await?;
    state.service.remove(&existent).await?;
    Ok(StatusCode::NO_CONTENT)
}
