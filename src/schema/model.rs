//! Schema and property value objects
//!
//! A [`Schema`] describes one type for presentation layers; each
//! [`Property`] is one of its fields. Both serialize to JSON with camelCase
//! names (`entityName`, `maxLength`, `childSchema`). The schema's
//! `description` is a reference to one of its own properties and is written
//! out as a copy of that property.

use crate::schema::field_type::FieldType;
use serde::{Deserialize, Serialize};

/// One field of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub name: String,
    pub caption: String,
    pub max_length: u32,
    pub precision: u32,
    pub required: bool,
    pub regex: String,
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_schema: Option<Box<Schema>>,
}

impl Default for Property {
    fn default() -> Self {
        Self {
            field_type: FieldType::Text,
            name: String::new(),
            caption: String::new(),
            max_length: 255,
            precision: 0,
            required: true,
            regex: String::new(),
            values: Vec::new(),
            child_schema: None,
        }
    }
}

impl Property {
    pub fn new(field_type: FieldType, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            field_type,
            caption: humanize(&name),
            name,
            ..Self::default()
        }
    }

    /// Append an enumerated value, ignoring blank renderings
    pub fn add_value(&mut self, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.values.push(value);
        }
    }
}

/// Presentation description of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SchemaRepr", into = "SchemaRepr")]
pub struct Schema {
    pub entity: String,
    pub entity_name: String,
    pub caption: String,
    description: Option<usize>,
    properties: Vec<Property>,
}

impl Schema {
    pub fn new(entity: impl Into<String>, entity_name: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            entity_name: entity_name.into(),
            caption: caption.into(),
            description: None,
            properties: Vec::new(),
        }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Append a property and return its position
    pub fn add_property(&mut self, property: Property) -> usize {
        self.properties.push(property);
        self.properties.len() - 1
    }

    /// The property marked as the type's display field
    pub fn description(&self) -> Option<&Property> {
        self.description.and_then(|index| self.properties.get(index))
    }

    /// Point the description at the property in position `index`; false if out of range
    ///
    /// Property names are not unique across hierarchy levels, so the
    /// reference is positional.
    pub fn set_description(&mut self, index: usize) -> bool {
        if index < self.properties.len() {
            self.description = Some(index);
            true
        } else {
            false
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaRepr {
    entity: String,
    entity_name: String,
    caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<Property>,
    #[serde(default)]
    properties: Vec<Property>,
}

impl From<Schema> for SchemaRepr {
    fn from(schema: Schema) -> Self {
        let description = schema.description().cloned();
        Self {
            entity: schema.entity,
            entity_name: schema.entity_name,
            caption: schema.caption,
            description,
            properties: schema.properties,
        }
    }
}

impl From<SchemaRepr> for Schema {
    fn from(repr: SchemaRepr) -> Self {
        let description = repr
            .description
            .and_then(|d| repr.properties.iter().position(|p| *p == d));
        Self {
            entity: repr.entity,
            entity_name: repr.entity_name,
            caption: repr.caption,
            description,
            properties: repr.properties,
        }
    }
}

/// Turn an identifier into a caption: `dateOfBirth` becomes `Date Of Birth`
///
/// The first character is upper-cased and every later upper-case character
/// is preceded by a space.
pub fn humanize(identifier: &str) -> String {
    let mut chars = identifier.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut caption: String = first.to_uppercase().collect();
    for c in chars {
        if c.is_uppercase() {
            caption.push(' ');
        }
        caption.push(c);
    }
    caption
}
