//! Field values and typed accessor conversions
//!
//! The save pipeline reads and writes entity attributes through
//! [`FieldValue`]; the [`ToFieldValue`] / [`FromFieldValue`] traits bridge
//! between concrete Rust field types and that polymorphic value.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A polymorphic field value that can hold different types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a UUID if possible
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// True for null values and strings made only of whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Convert to a JSON value, the representation used by write scopes
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Interpret a JSON value as a field value
    ///
    /// Strings that parse as UUIDs stay strings: JSON has no UUID type and
    /// the typed conversion in [`FromFieldValue`] accepts both forms.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => FieldValue::String(s.clone()),
            other => FieldValue::String(other.to_string()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Null => "null",
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Uuid(u) => write!(f, "{}", u),
            FieldValue::DateTime(d) => write!(f, "{}", d.to_rfc3339()),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

/// Failure to read or write an entity attribute through its accessors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FieldAccessError {
    #[error("'{entity}' has no accessible field '{field}'")]
    UnknownField { entity: String, field: String },

    #[error("field '{field}' expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("field '{field}' holds {value}, which does not fit a 64-bit signed integer")]
    OutOfRange { field: String, value: String },
}

/// Conversion of a concrete field into a [`FieldValue`]
///
/// Fails with the value's text when no [`FieldValue`] variant can hold it.
pub trait ToFieldValue {
    fn to_field_value(&self) -> Result<FieldValue, String>;
}

/// Read `value` as a [`FieldValue`], naming `field` in the error
pub fn read_field<T: ToFieldValue + ?Sized>(field: &str, value: &T) -> Result<FieldValue, FieldAccessError> {
    value.to_field_value().map_err(|value| FieldAccessError::OutOfRange {
        field: field.to_string(),
        value,
    })
}

/// Conversion of a [`FieldValue`] back into a concrete field type
///
/// On mismatch the `expected` type name is returned so the caller can build a
/// [`FieldAccessError::TypeMismatch`] with the field name attached.
pub trait FromFieldValue: Sized {
    fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)>;
}

/// Convert `value` into `T`, naming `field` in the error
pub fn convert_field<T: FromFieldValue>(field: &str, value: FieldValue) -> Result<T, FieldAccessError> {
    T::from_field_value(value).map_err(|(expected, actual)| FieldAccessError::TypeMismatch {
        field: field.to_string(),
        expected,
        actual,
    })
}

impl ToFieldValue for String {
    fn to_field_value(&self) -> Result<FieldValue, String> {
        Ok(FieldValue::String(self.clone()))
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)> {
        match value {
            FieldValue::String(s) => Ok(s),
            FieldValue::Uuid(u) => Ok(u.to_string()),
            other => Err(("string", other.kind())),
        }
    }
}

impl ToFieldValue for bool {
    fn to_field_value(&self) -> Result<FieldValue, String> {
        Ok(FieldValue::Boolean(*self))
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)> {
        match value {
            FieldValue::Boolean(b) => Ok(b),
            other => Err(("boolean", other.kind())),
        }
    }
}

impl ToFieldValue for char {
    fn to_field_value(&self) -> Result<FieldValue, String> {
        Ok(FieldValue::String(self.to_string()))
    }
}

impl FromFieldValue for char {
    fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)> {
        match value {
            FieldValue::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(("single character", "string")),
                }
            }
            other => Err(("single character", other.kind())),
        }
    }
}

macro_rules! integer_field_value {
    ($($ty:ty),*) => {
        $(
            impl ToFieldValue for $ty {
                fn to_field_value(&self) -> Result<FieldValue, String> {
                    i64::try_from(*self)
                        .map(FieldValue::Integer)
                        .map_err(|_| self.to_string())
                }
            }

            impl FromFieldValue for $ty {
                fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)> {
                    match value {
                        FieldValue::Integer(i) => <$ty>::try_from(i).map_err(|_| ("integer in range", "integer")),
                        other => Err(("integer", other.kind())),
                    }
                }
            }
        )*
    };
}

integer_field_value!(i16, i32, i64, u16, u32, u64);

impl ToFieldValue for f64 {
    fn to_field_value(&self) -> Result<FieldValue, String> {
        Ok(FieldValue::Float(*self))
    }
}

impl FromFieldValue for f64 {
    fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)> {
        match value {
            FieldValue::Float(v) => Ok(v),
            FieldValue::Integer(i) => Ok(i as f64),
            other => Err(("float", other.kind())),
        }
    }
}

impl ToFieldValue for Uuid {
    fn to_field_value(&self) -> Result<FieldValue, String> {
        Ok(FieldValue::Uuid(*self))
    }
}

impl FromFieldValue for Uuid {
    fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)> {
        match value {
            FieldValue::Uuid(u) => Ok(u),
            FieldValue::String(s) => Uuid::parse_str(&s).map_err(|_| ("uuid", "string")),
            other => Err(("uuid", other.kind())),
        }
    }
}

impl ToFieldValue for DateTime<Utc> {
    fn to_field_value(&self) -> Result<FieldValue, String> {
        Ok(FieldValue::DateTime(*self))
    }
}

impl FromFieldValue for DateTime<Utc> {
    fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)> {
        match value {
            FieldValue::DateTime(d) => Ok(d),
            FieldValue::String(s) => DateTime::parse_from_rfc3339(&s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| ("datetime", "string")),
            other => Err(("datetime", other.kind())),
        }
    }
}

impl ToFieldValue for NaiveDate {
    fn to_field_value(&self) -> Result<FieldValue, String> {
        Ok(FieldValue::String(self.to_string()))
    }
}

impl FromFieldValue for NaiveDate {
    fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)> {
        match value {
            FieldValue::String(s) => s.parse().map_err(|_| ("date", "string")),
            other => Err(("date", other.kind())),
        }
    }
}

impl<T: ToFieldValue> ToFieldValue for Option<T> {
    fn to_field_value(&self) -> Result<FieldValue, String> {
        match self {
            Some(v) => v.to_field_value(),
            None => Ok(FieldValue::Null),
        }
    }
}

impl<T: FromFieldValue> FromFieldValue for Option<T> {
    fn from_field_value(value: FieldValue) -> Result<Self, (&'static str, &'static str)> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}
