//! Write scope: the transactional resource bound to one repository call
//!
//! A [`ScopeFactory`] hands out a fresh [`WriteScope`] per call. The caller
//! owns it for the duration of that call and must `close` it exactly once on
//! every exit path; nothing is stored in thread-bound or global state.
//!
//! Records cross this boundary as `serde_json::Value` objects. A
//! [`RecordSpec`] tells the scope which attribute is the identifier and
//! which carries the optimistic version.

use crate::core::field::FieldValue;
use crate::schema::descriptor::{TypeDescriptor, TypeRef, simple_name};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure raised by a write scope
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WriteError {
    /// A uniqueness constraint rejected the write
    #[error("constraint '{constraint}' violated: {message}")]
    ConstraintViolation { constraint: String, message: String },

    /// The query text is not understood by the store
    #[error("malformed query '{query}': {message}")]
    InvalidQuery { query: String, message: String },

    /// Any other failure
    #[error("{0}")]
    Failure(String),
}

impl WriteError {
    pub fn failure(message: impl Into<String>) -> Self {
        WriteError::Failure(message.into())
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, WriteError::ConstraintViolation { .. })
    }

    pub fn is_invalid_query(&self) -> bool {
        matches!(self, WriteError::InvalidQuery { .. })
    }
}

/// How identifiers of a record type are generated on persist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Sequence of integers starting at 1
    Integer,
    /// Random v4 UUID
    Uuid,
    /// Random v4 UUID rendered as plain text
    Text,
}

/// Storage layout of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    pub entity_type: String,
    pub id_field: Option<String>,
    pub id_kind: IdKind,
    pub version_field: Option<String>,
}

impl RecordSpec {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id_field: None,
            id_kind: IdKind::Text,
            version_field: None,
        }
    }

    pub fn with_id(mut self, field: impl Into<String>, kind: IdKind) -> Self {
        self.id_field = Some(field.into());
        self.id_kind = kind;
        self
    }

    pub fn with_version(mut self, field: impl Into<String>) -> Self {
        self.version_field = Some(field.into());
        self
    }

    /// Derive the layout from the identifier and version markers
    pub fn from_descriptor(descriptor: &TypeDescriptor) -> Self {
        let mut spec = Self::new(descriptor.name());
        if let Some(id) = descriptor.identifier() {
            let kind = match &id.ty {
                TypeRef::Number(_) => IdKind::Integer,
                TypeRef::Opaque(name) if simple_name(name) == "Uuid" => IdKind::Uuid,
                _ => IdKind::Text,
            };
            spec = spec.with_id(id.name, kind);
        }
        if let Some(version) = descriptor.version_attribute() {
            spec = spec.with_version(version.name);
        }
        spec
    }

    /// Identifier of `record`, `Null` when missing
    pub fn id_of(&self, record: &Value) -> FieldValue {
        self.id_field
            .as_deref()
            .and_then(|field| record.get(field))
            .map(FieldValue::from_json)
            .unwrap_or(FieldValue::Null)
    }
}

/// Transactional connection-like resource
#[async_trait]
pub trait WriteScope: Send {
    async fn begin(&mut self) -> Result<(), WriteError>;

    async fn commit(&mut self) -> Result<(), WriteError>;

    async fn rollback(&mut self) -> Result<(), WriteError>;

    /// Release the scope; an open transaction is discarded
    async fn close(&mut self);

    async fn find(&mut self, spec: &RecordSpec, id: &FieldValue)
    -> Result<Option<Value>, WriteError>;

    /// Update-style write; fails for records without a stored identity
    async fn merge(&mut self, spec: &RecordSpec, record: Value) -> Result<Value, WriteError>;

    /// Insert-style write; assigns the identifier when missing
    async fn persist(&mut self, spec: &RecordSpec, record: Value) -> Result<Value, WriteError>;

    /// Returns whether a record was removed
    async fn remove(&mut self, spec: &RecordSpec, id: &FieldValue) -> Result<bool, WriteError>;

    /// Run a query; `max == 0` means unbounded
    async fn query(
        &mut self,
        spec: &RecordSpec,
        query: &str,
        first: usize,
        max: usize,
    ) -> Result<Vec<Value>, WriteError>;

    /// Delete every record matching `query`, returning the affected count
    async fn execute_delete(&mut self, spec: &RecordSpec, query: &str) -> Result<u64, WriteError>;
}

/// Source of write scopes
#[async_trait]
pub trait ScopeFactory: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn WriteScope>, WriteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::descriptor::{AttributeDescriptor, Describe};
    use serde_json::json;

    struct Account;

    impl Describe for Account {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::of::<Account>()
                .attribute(AttributeDescriptor::new("id", TypeRef::opaque::<uuid::Uuid>()).identifier())
                .attribute(AttributeDescriptor::new("revision", TypeRef::number::<i32>()).version())
        }
    }

    #[test]
    fn test_spec_from_descriptor() {
        let spec = RecordSpec::from_descriptor(&Account::describe());
        assert_eq!(spec.id_field.as_deref(), Some("id"));
        assert_eq!(spec.id_kind, IdKind::Uuid);
        assert_eq!(spec.version_field.as_deref(), Some("revision"));
    }

    #[test]
    fn test_id_of() {
        let spec = RecordSpec::new("Thing").with_id("code", IdKind::Integer);
        assert_eq!(spec.id_of(&json!({"code": 4})), FieldValue::Integer(4));
        assert_eq!(spec.id_of(&json!({"code": null})), FieldValue::Null);
        assert_eq!(spec.id_of(&json!({})), FieldValue::Null);
        assert_eq!(RecordSpec::new("Thing").id_of(&json!({"id": 1})), FieldValue::Null);
    }

    #[test]
    fn test_write_error_kinds() {
        let conflict = WriteError::ConstraintViolation {
            constraint: "login".to_string(),
            message: "duplicate".to_string(),
        };
        assert!(conflict.is_constraint_violation());
        assert!(!WriteError::failure("boom").is_constraint_violation());
        assert_eq!(WriteError::failure("boom").to_string(), "boom");
    }
}
