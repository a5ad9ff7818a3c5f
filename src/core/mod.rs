//! Core module containing fundamental traits and types for the framework

pub mod auth;
pub mod entity;
pub mod error;
pub mod field;

pub use auth::{AccessGuard, AccessLevel, AccessPolicy, AuthContext, AuthProvider, IssuedTokens, Operation};
pub use entity::Entity;
pub use error::{FrameworkError, FrameworkResult};
pub use field::{FieldAccessError, FieldValue, FromFieldValue, ToFieldValue, read_field};
