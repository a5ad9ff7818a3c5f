//! Schema generation for presentation layers
//!
//! Types describe themselves through [`Describe`]; the [`SchemaGenerator`]
//! turns those descriptors into serializable [`Schema`] trees.

pub mod descriptor;
pub mod field_type;
pub mod generator;
pub mod model;

pub use descriptor::{
    AttributeDescriptor, Column, Describe, EntityRef, EnumRef, Enumeration, TypeDescriptor, TypeRef,
};
pub use field_type::FieldType;
pub use generator::{CustomSchemaOutcome, SchemaError, SchemaGenerator};
pub use model::{Property, Schema, humanize};
