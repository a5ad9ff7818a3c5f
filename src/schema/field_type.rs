//! Presentation field types and attribute classification

use crate::schema::descriptor::{AttributeDescriptor, TypeRef};
use serde::{Deserialize, Serialize};

/// Field type of a schema property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Enumerated,
    Date,
    Secret,
    /// 1:1 owned reference to another user type
    Composition,
    /// 1:N collection or array
    List,
    /// Raw bytes (file, stream)
    Resource,
}

impl FieldType {
    /// Classify an attribute; the first matching rule wins
    pub fn classify(attribute: &AttributeDescriptor) -> FieldType {
        match &attribute.ty {
            TypeRef::Enum(_) => FieldType::Enumerated,
            _ if attribute.secret => FieldType::Secret,
            TypeRef::String | TypeRef::Char => FieldType::Text,
            TypeRef::Bool => FieldType::Boolean,
            TypeRef::Date(_) => FieldType::Date,
            TypeRef::Bytes => FieldType::Resource,
            TypeRef::Collection(_) | TypeRef::Array(_) => FieldType::List,
            TypeRef::Number(_) => FieldType::Number,
            TypeRef::Entity(_) | TypeRef::Opaque(_) => FieldType::Composition,
        }
    }
}
