//! # crudframe
//!
//! Generic CRUD layers for entities that describe themselves.
//!
//! ## Features
//!
//! - **Descriptor-driven schemas**: entities implement [`Describe`](schema::Describe)
//!   and the [`SchemaGenerator`](schema::SchemaGenerator) builds presentation schemas
//! - **Save pipeline**: random values, digests, identifiers and versions are
//!   resolved around every merge or persist
//! - **Query functions**: `#encrypt(...)` inside query text is replaced by the digest
//!   of its argument
//! - **Scoped writes**: every repository call owns one write scope, closed exactly once
//! - **REST resources**: CRUD and schema routes per entity, built on axum
//! - **Access levels**: per resource and per operation, checked against a
//!   token before the handler runs
//! - **Configuration-Based**: server, token lookup, route names and access levels from YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crudframe::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Option<i64>,
//!     pub login: String,
//!     pub password: Option<String>,
//! }
//!
//! impl Describe for User {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::of::<User>()
//!             .attribute(AttributeDescriptor::new("id", TypeRef::number::<i64>()).identifier())
//!             .attribute(AttributeDescriptor::new("login", TypeRef::String).display())
//!             .attribute(
//!                 AttributeDescriptor::new("password", TypeRef::String)
//!                     .secret()
//!                     .encrypt(Algorithm::Sha256),
//!             )
//!     }
//! }
//!
//! impl_entity!(User, "user", "users", [id, login, password]);
//!
//! let store = InMemoryStore::new().unique::<User>("login");
//! let repository = GenericRepository::<User>::new(Arc::new(store));
//! let service = GenericService::new(Arc::new(repository));
//!
//! ServerBuilder::new()
//!     .register_resource(EntityResource::new(Arc::new(service)))
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod persistence;
pub mod repository;
pub mod schema;
pub mod security;
pub mod server;
pub mod service;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        auth::{AccessGuard, AccessLevel, AccessPolicy, AuthContext, AuthProvider, IssuedTokens, Operation},
        entity::Entity,
        error::{EntityError, FrameworkError, FrameworkResult},
        field::{FieldAccessError, FieldValue, FromFieldValue, ToFieldValue},
    };

    // === Macros ===
    pub use crate::impl_entity;

    // === Schema ===
    pub use crate::schema::{
        AttributeDescriptor, Column, Describe, Enumeration, FieldType, Schema, SchemaGenerator,
        TypeDescriptor, TypeRef,
    };

    // === Security ===
    pub use crate::security::{Algorithm, Encrypter, RandomSpec, Token, TokenGenerator};

    // === Persistence ===
    pub use crate::persistence::{InMemoryStore, RecordSpec, ScopeFactory, WriteError, WriteScope};

    // === Repository and Service ===
    pub use crate::repository::{FieldOutcome, GenericRepository, Repository, SaveReport};
    pub use crate::service::{GenericService, Service};

    // === Config ===
    pub use crate::config::FrameworkConfig;

    // === Server ===
    pub use crate::server::{EntityDescriptor, EntityRegistry, EntityResource, ServerBuilder};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
    pub use uuid::Uuid;
}
