//! Entity trait: the capability every persisted type implements

use crate::core::field::{FieldAccessError, FieldValue};
use crate::schema::descriptor::{Describe, simple_name};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Base trait for all persisted entities.
///
/// An entity describes its attributes through [`Describe`] and exposes
/// named accessors for the attributes the save pipeline touches (identifier,
/// version, random and encrypted fields). Use [`impl_entity!`](crate::impl_entity)
/// to generate the accessors.
pub trait Entity: Describe + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The plural resource name used in URLs (e.g., "users", "companies")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "user", "company")
    fn resource_name_singular() -> &'static str;

    /// Read an accessible attribute
    fn field_value(&self, field: &str) -> Result<FieldValue, FieldAccessError>;

    /// Write an accessible attribute
    fn set_field_value(&mut self, field: &str, value: FieldValue) -> Result<(), FieldAccessError>;

    /// Simple type name, used in messages
    fn entity_name() -> &'static str {
        simple_name(std::any::type_name::<Self>())
    }

    /// Current identifier value, `Null` when unset or undeclared
    fn id_value(&self) -> FieldValue {
        Self::describe()
            .identifier()
            .and_then(|attribute| self.field_value(attribute.name).ok())
            .unwrap_or(FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::descriptor::{AttributeDescriptor, TypeDescriptor, TypeRef};
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        id: Option<i64>,
        text: String,
    }

    impl Describe for Note {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::of::<Note>()
                .attribute(AttributeDescriptor::new("id", TypeRef::number::<i64>()).identifier())
                .attribute(AttributeDescriptor::new("text", TypeRef::String))
        }
    }

    crate::impl_entity!(Note, "note", "notes", [id, text]);

    #[test]
    fn test_entity_metadata() {
        assert_eq!(Note::resource_name(), "notes");
        assert_eq!(Note::resource_name_singular(), "note");
        assert_eq!(Note::entity_name(), "Note");
    }

    #[test]
    fn test_accessors() {
        let mut note = Note {
            id: None,
            text: "hello".to_string(),
        };
        assert_eq!(note.id_value(), FieldValue::Null);
        assert_eq!(
            note.field_value("text"),
            Ok(FieldValue::String("hello".to_string()))
        );
        assert!(matches!(
            note.field_value("missing"),
            Err(FieldAccessError::UnknownField { .. })
        ));

        note.set_field_value("id", FieldValue::Integer(9)).unwrap();
        assert_eq!(note.id, Some(9));
        assert_eq!(note.id_value(), FieldValue::Integer(9));
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Counter {
        id: Option<u64>,
    }

    impl Describe for Counter {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::of::<Counter>()
                .attribute(AttributeDescriptor::new("id", TypeRef::number::<u64>()).identifier())
        }
    }

    crate::impl_entity!(Counter, "counter", "counters", [id]);

    #[test]
    fn test_unsigned_identifier_above_i64_fails_to_read() {
        let counter = Counter { id: Some(u64::MAX) };
        assert!(matches!(
            counter.field_value("id"),
            Err(FieldAccessError::OutOfRange { .. })
        ));
        assert_eq!(counter.id_value(), FieldValue::Null);

        let counter = Counter { id: Some(7) };
        assert_eq!(counter.field_value("id"), Ok(FieldValue::Integer(7)));
    }

    #[test]
    fn test_set_unknown_field_fails() {
        let mut note = Note {
            id: None,
            text: String::new(),
        };
        let err = note
            .set_field_value("title", FieldValue::String("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, FieldAccessError::UnknownField { .. }));
    }

    #[test]
    fn test_set_wrong_type_fails() {
        let mut note = Note {
            id: None,
            text: String::new(),
        };
        let err = note
            .set_field_value("text", FieldValue::Integer(1))
            .unwrap_err();
        assert!(matches!(err, FieldAccessError::TypeMismatch { .. }));
    }
}
