//! Schema generation over described type graphs
//!
//! These tests build small type graphs (inheritance, compositions,
//! collections, reference cycles) and check the generated schema trees and
//! their JSON rendering.

use crudframe::prelude::*;
use crudframe::schema::{CustomSchemaOutcome, Property, SchemaError, humanize};
use serde_json::Value;

// =============================================================================
// Test Types
// =============================================================================

struct Gender;

impl Enumeration for Gender {
    fn constants() -> Vec<String> {
        vec!["FEMALE".to_string(), "MALE".to_string(), "OTHER".to_string()]
    }
}

struct Audited;

impl Describe for Audited {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Audited>()
            .attribute(AttributeDescriptor::new("createdBy", TypeRef::String))
            .attribute(AttributeDescriptor::new(
                "createdAt",
                TypeRef::date::<chrono::DateTime<chrono::Utc>>(),
            ))
    }
}

struct Person;

impl Describe for Person {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Person>()
            .extends::<Audited>()
            .attribute(AttributeDescriptor::new("id", TypeRef::number::<i64>()).identifier())
            .attribute(
                AttributeDescriptor::new("fullName", TypeRef::String)
                    .column(Column::new().length(120).nullable(false))
                    .display(),
            )
            .attribute(AttributeDescriptor::new("password", TypeRef::String).secret())
            .attribute(AttributeDescriptor::new("gender", TypeRef::enumeration::<Gender>()))
            .attribute(AttributeDescriptor::new("active", TypeRef::Bool))
            .attribute(AttributeDescriptor::new("avatar", TypeRef::Bytes))
            .attribute(AttributeDescriptor::new("address", TypeRef::entity::<Address>()))
            .attribute(AttributeDescriptor::new(
                "phones",
                TypeRef::collection(TypeRef::entity::<Phone>()),
            ))
            .attribute(AttributeDescriptor::new(
                "nicknames",
                TypeRef::collection(TypeRef::String),
            ))
            .attribute(AttributeDescriptor::new("SERIAL", TypeRef::number::<i64>()).constant())
    }
}

struct Address;

impl Describe for Address {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Address>()
            .attribute(AttributeDescriptor::new("street", TypeRef::String).display())
            .attribute(AttributeDescriptor::new("resident", TypeRef::entity::<Person>()))
    }
}

struct Phone;

impl Describe for Phone {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Phone>()
            .attribute(AttributeDescriptor::new("number", TypeRef::String))
            .attribute(AttributeDescriptor::new("owner", TypeRef::entity::<Person>()))
    }
}

// A -> B -> C -> A, never a direct back-reference
struct Alpha;
struct Beta;
struct Gamma;

impl Describe for Alpha {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Alpha>().attribute(AttributeDescriptor::new("beta", TypeRef::entity::<Beta>()))
    }
}

impl Describe for Beta {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Beta>().attribute(AttributeDescriptor::new("gamma", TypeRef::entity::<Gamma>()))
    }
}

impl Describe for Gamma {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Gamma>()
            .attribute(AttributeDescriptor::new("label", TypeRef::String))
            .attribute(AttributeDescriptor::new("alpha", TypeRef::entity::<Alpha>()))
    }
}

struct Handmade;

impl Describe for Handmade {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Handmade>()
            .attribute(AttributeDescriptor::new("ignored", TypeRef::String))
            .schematic(|| {
                let mut schema = Schema::new("handmade", "handmade", "Hand Made");
                schema.add_property(Property::new(FieldType::Text, "title"));
                Ok(schema)
            })
    }
}

struct Faulty;

impl Describe for Faulty {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Faulty>()
            .attribute(AttributeDescriptor::new("title", TypeRef::String))
            .schematic(|| Err(anyhow::anyhow!("template missing")))
    }
}

struct Unnamed;

impl Describe for Unnamed {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Unnamed>().attribute(AttributeDescriptor::new("", TypeRef::String))
    }
}

struct Holder;

impl Describe for Holder {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Holder>()
            .attribute(AttributeDescriptor::new("title", TypeRef::String))
            .attribute(AttributeDescriptor::new("inner", TypeRef::entity::<Unnamed>()))
    }
}

// Both levels declare `label`; only the ancestor's is the display field
struct Labelled;
struct Tagged;

impl Describe for Labelled {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Labelled>()
            .attribute(AttributeDescriptor::new("label", TypeRef::String).display())
    }
}

impl Describe for Tagged {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Tagged>()
            .extends::<Labelled>()
            .attribute(AttributeDescriptor::new("label", TypeRef::number::<i64>()))
    }
}

fn names(schema: &Schema) -> Vec<&str> {
    schema.properties().iter().map(|p| p.name.as_str()).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_person_schema_walks_subtype_then_ancestor() {
    let schema = SchemaGenerator::new().generate_for::<Person>().unwrap();

    assert!(schema.entity.ends_with("::Person"));
    assert_eq!(schema.entity_name, "person");
    assert_eq!(schema.caption, "Person");
    assert_eq!(
        names(&schema),
        vec![
            "id", "fullName", "password", "gender", "active", "avatar", "address", "phones",
            "nicknames", "createdBy", "createdAt",
        ]
    );
}

#[test]
fn test_description_points_at_display_property_across_levels() {
    let schema = SchemaGenerator::new().generate_for::<Tagged>().unwrap();

    assert_eq!(names(&schema), vec!["label", "label"]);
    let description = schema.description().unwrap();
    assert_eq!(description.field_type, FieldType::Text);

    let json = serde_json::to_value(&schema).unwrap();
    assert_eq!(json["description"]["type"], "TEXT");
    assert_eq!(json["properties"][0]["type"], "NUMBER");
}

#[test]
fn test_person_property_types() {
    let schema = SchemaGenerator::new().generate_for::<Person>().unwrap();
    let type_of = |name: &str| schema.property(name).unwrap().field_type;

    assert_eq!(type_of("id"), FieldType::Number);
    assert_eq!(type_of("fullName"), FieldType::Text);
    assert_eq!(type_of("password"), FieldType::Secret);
    assert_eq!(type_of("gender"), FieldType::Enumerated);
    assert_eq!(type_of("active"), FieldType::Boolean);
    assert_eq!(type_of("avatar"), FieldType::Resource);
    assert_eq!(type_of("address"), FieldType::Composition);
    assert_eq!(type_of("phones"), FieldType::List);
    assert_eq!(type_of("createdAt"), FieldType::Date);
}

#[test]
fn test_column_constraints_and_enum_values() {
    let schema = SchemaGenerator::new().generate_for::<Person>().unwrap();

    let full_name = schema.property("fullName").unwrap();
    assert_eq!(full_name.caption, "Full Name");
    assert_eq!(full_name.max_length, 120);
    assert!(full_name.required);

    let gender = schema.property("gender").unwrap();
    assert_eq!(gender.values, vec!["FEMALE", "MALE", "OTHER"]);
    assert_eq!(gender.max_length, 255);

    assert_eq!(schema.description().map(|p| p.name.as_str()), Some("fullName"));
}

#[test]
fn test_composition_drops_back_reference_to_owner() {
    let schema = SchemaGenerator::new().generate_for::<Person>().unwrap();

    let address = schema.property("address").unwrap().child_schema.as_ref().unwrap();
    assert!(address.entity.ends_with("::Address"));
    assert_eq!(names(address), vec!["street"]);
    assert_eq!(address.description().map(|p| p.name.as_str()), Some("street"));
}

#[test]
fn test_collection_child_schema_names_element_type() {
    let schema = SchemaGenerator::new().generate_for::<Person>().unwrap();

    let phones = schema.property("phones").unwrap().child_schema.as_ref().unwrap();
    assert!(phones.entity.ends_with("::Phone"));
    // Collection elements are generated without an owner, Person is already on the chain
    let owner = phones.property("owner").unwrap();
    assert_eq!(owner.field_type, FieldType::Composition);
    assert!(owner.child_schema.is_none());

    let nicknames = schema.property("nicknames").unwrap().child_schema.as_ref().unwrap();
    assert_eq!(nicknames.entity, "alloc::string::String");
    assert_eq!(nicknames.entity_name, "string");
    assert!(nicknames.properties().is_empty());
}

#[test]
fn test_scalar_properties_have_no_child_schema() {
    let schema = SchemaGenerator::new().generate_for::<Audited>().unwrap();
    assert!(schema.properties().iter().all(|p| p.child_schema.is_none()));
}

#[test]
fn test_deep_cycle_terminates() {
    let schema = SchemaGenerator::new().generate_for::<Alpha>().unwrap();

    let beta = schema.property("beta").unwrap().child_schema.as_ref().unwrap();
    let gamma = beta.property("gamma").unwrap().child_schema.as_ref().unwrap();
    let alpha = gamma.property("alpha").unwrap();
    assert_eq!(alpha.field_type, FieldType::Composition);
    assert!(alpha.child_schema.is_none());
}

#[test]
fn test_custom_schema_is_used_verbatim() {
    let generator = SchemaGenerator::new();
    let schema = generator.generate_for::<Handmade>().unwrap();
    assert_eq!(schema.entity, "handmade");
    assert_eq!(names(&schema), vec!["title"]);

    assert!(matches!(
        generator.custom_schema(&Handmade::describe()),
        CustomSchemaOutcome::Custom(_)
    ));
    assert_eq!(
        generator.custom_schema(&Person::describe()),
        CustomSchemaOutcome::NotCustomizable
    );
}

#[test]
fn test_failing_custom_schema_falls_back() {
    let generator = SchemaGenerator::new();
    let schema = generator.generate_for::<Faulty>().unwrap();
    assert!(schema.entity.ends_with("::Faulty"));
    assert_eq!(names(&schema), vec!["title"]);

    match generator.custom_schema(&Faulty::describe()) {
        CustomSchemaOutcome::FellBack { reason } => assert!(reason.contains("template missing")),
        other => panic!("expected a fallback, got {:?}", other),
    }
}

#[test]
fn test_nested_introspection_failure_is_fatal() {
    let err = SchemaGenerator::new().generate_for::<Holder>().unwrap_err();
    assert!(matches!(err, SchemaError::UnnamedAttribute { .. }));
}

#[test]
fn test_json_rendering_uses_camel_case() {
    let schema = SchemaGenerator::new().generate_for::<Person>().unwrap();
    let json: Value = serde_json::to_value(&schema).unwrap();

    assert_eq!(json["entityName"], "person");
    assert_eq!(json["description"]["name"], "fullName");
    let address = &json["properties"][6];
    assert_eq!(address["type"], "COMPOSITION");
    assert_eq!(address["childSchema"]["entityName"], "address");
    assert_eq!(json["properties"][0]["maxLength"], 255);
    assert!(json["properties"][0].get("childSchema").is_none());

    let parsed: Schema = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, schema);
}

#[test]
fn test_humanize() {
    assert_eq!(humanize("dateOfBirth"), "Date Of Birth");
    assert_eq!(humanize("id"), "Id");
    assert_eq!(humanize("ABC"), "A B C");
}
