//! Type descriptors: the declarative field table each persisted type exposes
//!
//! A type opts into schema generation and the save pipeline by implementing
//! [`Describe`]. The descriptor lists its attributes in declaration order,
//! their declared [`TypeRef`], and the markers that alter pipeline
//! behaviour (secret, display field, random generation, encryption, ...).
//!
//! ```rust,ignore
//! impl Describe for User {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::of::<User>()
//!             .attribute(AttributeDescriptor::new("id", TypeRef::number::<i64>()).identifier())
//!             .attribute(AttributeDescriptor::new("login", TypeRef::String).display())
//!             .attribute(
//!                 AttributeDescriptor::new("password", TypeRef::String)
//!                     .secret()
//!                     .random(RandomSpec::default().retain_on_insert(true))
//!                     .encrypt(Algorithm::Md5),
//!             )
//!     }
//! }
//! ```

use crate::schema::model::Schema;
use crate::security::algorithm::Algorithm;
use crate::security::random::RandomSpec;
use std::any::type_name;
use std::fmt;

/// Implemented by every user type that can be schema-walked or persisted
pub trait Describe: 'static {
    fn describe() -> TypeDescriptor;
}

/// Implemented by enumerations used as attribute types
pub trait Enumeration: 'static {
    /// String rendering of every constant, in declaration order
    fn constants() -> Vec<String>;
}

/// Handle to a user-defined type's descriptor
#[derive(Clone, Copy)]
pub struct EntityRef {
    name: &'static str,
    describe: fn() -> TypeDescriptor,
}

impl EntityRef {
    pub fn of<T: Describe>() -> Self {
        Self {
            name: type_name::<T>(),
            describe: T::describe,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn descriptor(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.name).finish()
    }
}

/// Handle to an enumeration's constants
#[derive(Clone, Copy)]
pub struct EnumRef {
    name: &'static str,
    constants: fn() -> Vec<String>,
}

impl EnumRef {
    pub fn of<E: Enumeration>() -> Self {
        Self {
            name: type_name::<E>(),
            constants: E::constants,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn constants(&self) -> Vec<String> {
        (self.constants)()
    }
}

impl PartialEq for EnumRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for EnumRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnumRef").field(&self.name).finish()
    }
}

/// Declared type of an attribute
///
/// Every variant except [`TypeRef::Entity`] belongs to the platform: the
/// generator never walks into its fields.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    String,
    Char,
    Bool,
    /// Primitive or wrapper numeric type, carrying its type name
    Number(&'static str),
    /// Date, calendar or date-time representation
    Date(&'static str),
    /// Raw byte buffer
    Bytes,
    Enum(EnumRef),
    /// Growable collection (`Vec<T>`, `HashSet<T>`, ...) of an element type
    Collection(Box<TypeRef>),
    /// Fixed-size array of a component type
    Array(Box<TypeRef>),
    /// User-defined type with its own descriptor
    Entity(EntityRef),
    /// Any other library scalar (`Uuid`, `Decimal`, ...)
    Opaque(&'static str),
}

impl TypeRef {
    pub fn number<T: 'static>() -> Self {
        TypeRef::Number(type_name::<T>())
    }

    pub fn date<T: 'static>() -> Self {
        TypeRef::Date(type_name::<T>())
    }

    pub fn opaque<T: 'static>() -> Self {
        TypeRef::Opaque(type_name::<T>())
    }

    pub fn entity<T: Describe>() -> Self {
        TypeRef::Entity(EntityRef::of::<T>())
    }

    pub fn enumeration<E: Enumeration>() -> Self {
        TypeRef::Enum(EnumRef::of::<E>())
    }

    pub fn collection(element: TypeRef) -> Self {
        TypeRef::Collection(Box::new(element))
    }

    pub fn array(component: TypeRef) -> Self {
        TypeRef::Array(Box::new(component))
    }

    /// Fully qualified type name
    pub fn type_name(&self) -> String {
        match self {
            TypeRef::String => type_name::<String>().to_string(),
            TypeRef::Char => "char".to_string(),
            TypeRef::Bool => "bool".to_string(),
            TypeRef::Number(name) | TypeRef::Date(name) | TypeRef::Opaque(name) => {
                name.to_string()
            }
            TypeRef::Bytes => type_name::<Vec<u8>>().to_string(),
            TypeRef::Enum(e) => e.name().to_string(),
            TypeRef::Collection(element) => format!("alloc::vec::Vec<{}>", element.type_name()),
            TypeRef::Array(component) => format!("[{}]", component.type_name()),
            TypeRef::Entity(e) => e.name().to_string(),
        }
    }

    pub fn is_platform(&self) -> bool {
        !matches!(self, TypeRef::Entity(_))
    }

    /// True only for `String`; single characters cannot hold generated or digested text
    pub fn is_string(&self) -> bool {
        matches!(self, TypeRef::String)
    }
}

/// Strip module path and generic arguments from a type name
pub fn simple_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Length, nullability and precision constraints of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub length: u32,
    pub nullable: bool,
    pub precision: u32,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            length: 255,
            nullable: true,
            precision: 0,
        }
    }
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }
}

/// One declared attribute with its markers
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub ty: TypeRef,
    /// Rendered as a masked input
    pub secret: bool,
    /// Describes the owning record in listings
    pub display: bool,
    /// Left out of generated schemas
    pub exclude: bool,
    /// Immutable, never part of a schema
    pub constant: bool,
    pub column: Option<Column>,
    pub random: Option<RandomSpec>,
    pub encrypt: Option<Algorithm>,
    pub identifier: bool,
    pub version: bool,
}

impl AttributeDescriptor {
    pub fn new(name: &'static str, ty: TypeRef) -> Self {
        Self {
            name,
            ty,
            secret: false,
            display: false,
            exclude: false,
            constant: false,
            column: None,
            random: None,
            encrypt: None,
            identifier: false,
            version: false,
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn display(mut self) -> Self {
        self.display = true;
        self
    }

    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.column = Some(column);
        self
    }

    pub fn random(mut self, spec: RandomSpec) -> Self {
        self.random = Some(spec);
        self
    }

    pub fn encrypt(mut self, algorithm: Algorithm) -> Self {
        self.encrypt = Some(algorithm);
        self
    }

    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    pub fn version(mut self) -> Self {
        self.version = true;
        self
    }
}

/// Factory returning a hand-written schema for a type
pub type SchemaFactory = fn() -> anyhow::Result<Schema>;

/// Declared shape of one user type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: &'static str,
    parent: Option<EntityRef>,
    attributes: Vec<AttributeDescriptor>,
    schematic: Option<SchemaFactory>,
}

impl TypeDescriptor {
    pub fn of<T: 'static>() -> Self {
        Self::named(type_name::<T>())
    }

    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            parent: None,
            attributes: Vec::new(),
            schematic: None,
        }
    }

    /// Declare the embedded base type whose attributes this type inherits
    pub fn extends<P: Describe>(mut self) -> Self {
        self.parent = Some(EntityRef::of::<P>());
        self
    }

    pub fn attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Replace default generation with a hand-written schema
    pub fn schematic(mut self, factory: SchemaFactory) -> Self {
        self.schematic = Some(factory);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn simple_name(&self) -> &'static str {
        simple_name(self.name)
    }

    pub fn parent(&self) -> Option<EntityRef> {
        self.parent
    }

    /// Attributes declared at this level only
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn custom_schema(&self) -> Option<SchemaFactory> {
        self.schematic
    }

    /// This descriptor followed by each ancestor, outward
    pub fn ancestry(&self) -> Vec<TypeDescriptor> {
        let mut levels = vec![self.clone()];
        let mut next = self.parent;
        while let Some(parent) = next {
            if levels.iter().any(|level| level.name == parent.name()) {
                break;
            }
            let descriptor = parent.descriptor();
            next = descriptor.parent;
            levels.push(descriptor);
        }
        levels
    }

    /// Attributes of every level, subtype first
    pub fn all_attributes(&self) -> Vec<AttributeDescriptor> {
        self.ancestry()
            .into_iter()
            .flat_map(|level| level.attributes)
            .collect()
    }

    pub fn find_attribute(&self, name: &str) -> Option<AttributeDescriptor> {
        self.all_attributes().into_iter().find(|a| a.name == name)
    }

    pub fn identifier(&self) -> Option<AttributeDescriptor> {
        self.all_attributes().into_iter().find(|a| a.identifier)
    }

    pub fn version_attribute(&self) -> Option<AttributeDescriptor> {
        self.all_attributes().into_iter().find(|a| a.version)
    }

    /// First encryption algorithm declared on any attribute
    pub fn encryption_marker(&self) -> Option<Algorithm> {
        self.all_attributes().into_iter().find_map(|a| a.encrypt)
    }
}
