//! Descriptor-driven schema generation
//!
//! The generator walks a type's attributes, level by level from the type
//! itself outward through its embedded parents, classifies each attribute
//! and recurses into composed types and collection element types.
//!
//! Recursion is guarded two ways:
//! - an attribute whose type is the *owner* (the type that composed the one
//!   being generated) is dropped from the property list entirely;
//! - any other attribute whose type is already being generated further up
//!   the chain is kept, but without a child schema.

use crate::schema::descriptor::{AttributeDescriptor, Describe, TypeDescriptor, TypeRef, simple_name};
use crate::schema::field_type::FieldType;
use crate::schema::model::{Property, Schema, humanize};
use std::collections::HashSet;
use thiserror::Error;

/// Fatal schema generation failure; no partial schema is produced
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("type '{entity}' declares an attribute with an empty name")]
    UnnamedAttribute { entity: String },

    #[error("type '{entity}' declares attribute '{attribute}' more than once")]
    DuplicateAttribute { entity: String, attribute: String },
}

/// Result of consulting a type's custom schema factory
#[derive(Debug, Clone, PartialEq)]
pub enum CustomSchemaOutcome {
    /// The type has no custom factory
    NotCustomizable,
    /// The factory produced a schema, used verbatim
    Custom(Schema),
    /// The factory failed; default generation applies
    FellBack { reason: String },
}

/// Builds [`Schema`] trees from [`TypeDescriptor`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaGenerator;

impl SchemaGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate the schema of a described type
    pub fn generate_for<T: Describe>(&self) -> Result<Schema, SchemaError> {
        self.generate(&T::describe())
    }

    pub fn generate(&self, descriptor: &TypeDescriptor) -> Result<Schema, SchemaError> {
        self.generate_owned_by(descriptor, None)
    }

    /// Generate a schema for a type composed by `owner` (a type name)
    pub fn generate_owned_by(
        &self,
        descriptor: &TypeDescriptor,
        owner: Option<&str>,
    ) -> Result<Schema, SchemaError> {
        let mut chain = Vec::new();
        self.walk(descriptor, owner, &mut chain)
    }

    /// Run the type's custom schema factory, if it has one
    ///
    /// Panics inside the factory are treated like returned errors.
    pub fn custom_schema(&self, descriptor: &TypeDescriptor) -> CustomSchemaOutcome {
        let Some(factory) = descriptor.custom_schema() else {
            return CustomSchemaOutcome::NotCustomizable;
        };

        let reason = match std::panic::catch_unwind(factory) {
            Ok(Ok(schema)) => return CustomSchemaOutcome::Custom(schema),
            Ok(Err(e)) => e.to_string(),
            Err(_) => "custom schema factory panicked".to_string(),
        };

        tracing::warn!(
            entity = descriptor.name(),
            reason = %reason,
            "Custom schema failed, generating the default schema"
        );
        CustomSchemaOutcome::FellBack { reason }
    }

    fn walk(
        &self,
        descriptor: &TypeDescriptor,
        owner: Option<&str>,
        chain: &mut Vec<&'static str>,
    ) -> Result<Schema, SchemaError> {
        if let CustomSchemaOutcome::Custom(schema) = self.custom_schema(descriptor) {
            return Ok(schema);
        }

        let simple = descriptor.simple_name();
        let mut schema = Schema::new(descriptor.name(), simple.to_lowercase(), humanize(simple));

        chain.push(descriptor.name());
        let walked = self.walk_levels(descriptor, owner, chain, &mut schema);
        chain.pop();

        walked.map(|_| schema)
    }

    fn walk_levels(
        &self,
        descriptor: &TypeDescriptor,
        owner: Option<&str>,
        chain: &mut Vec<&'static str>,
        schema: &mut Schema,
    ) -> Result<(), SchemaError> {
        for level in descriptor.ancestry() {
            let mut seen = HashSet::new();

            for attribute in level.attributes() {
                if attribute.name.is_empty() {
                    return Err(SchemaError::UnnamedAttribute {
                        entity: level.name().to_string(),
                    });
                }
                if !seen.insert(attribute.name) {
                    return Err(SchemaError::DuplicateAttribute {
                        entity: level.name().to_string(),
                        attribute: attribute.name.to_string(),
                    });
                }

                if attribute.constant || attribute.exclude {
                    continue;
                }
                if let (TypeRef::Entity(target), Some(owner)) = (&attribute.ty, owner) {
                    if target.name() == owner {
                        continue;
                    }
                }

                let mut property = basic_property(attribute);
                property.child_schema = self
                    .child_schema(attribute, level.name(), chain)?
                    .map(Box::new);
                let index = schema.add_property(property);

                if attribute.display && schema.description().is_none() {
                    schema.set_description(index);
                }
            }
        }
        Ok(())
    }

    fn child_schema(
        &self,
        attribute: &AttributeDescriptor,
        level: &'static str,
        chain: &mut Vec<&'static str>,
    ) -> Result<Option<Schema>, SchemaError> {
        match &attribute.ty {
            TypeRef::Collection(element) | TypeRef::Array(element) => {
                self.element_schema(element, chain)
            }
            TypeRef::Entity(target) if FieldType::classify(attribute) == FieldType::Composition => {
                if chain.contains(&target.name()) {
                    tracing::debug!(
                        attribute = attribute.name,
                        target = target.name(),
                        "Type already on the generation chain, not recursing"
                    );
                    return Ok(None);
                }
                self.walk(&target.descriptor(), Some(level), chain).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn element_schema(
        &self,
        element: &TypeRef,
        chain: &mut Vec<&'static str>,
    ) -> Result<Option<Schema>, SchemaError> {
        match element {
            TypeRef::Entity(target) => {
                if chain.contains(&target.name()) {
                    return Ok(None);
                }
                self.walk(&target.descriptor(), None, chain).map(Some)
            }
            platform => Ok(Some(platform_schema(platform))),
        }
    }
}

/// Schema of a platform type: named, but with no walked properties
fn platform_schema(ty: &TypeRef) -> Schema {
    let full = ty.type_name();
    let simple = simple_name(&full).to_string();
    Schema::new(full.clone(), simple.to_lowercase(), humanize(&simple))
}

fn basic_property(attribute: &AttributeDescriptor) -> Property {
    let field_type = FieldType::classify(attribute);
    let mut property = Property::new(field_type, attribute.name);

    if let Some(column) = attribute.column {
        property.max_length = column.length;
        property.required = !column.nullable;
        property.precision = column.precision;
    }

    if let (FieldType::Enumerated, TypeRef::Enum(enumeration)) = (field_type, &attribute.ty) {
        for constant in enumeration.constants() {
            property.add_value(constant);
        }
    }

    property
}
