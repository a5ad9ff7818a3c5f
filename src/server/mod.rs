//! Server module for building HTTP servers with auto-registered routes
//!
//! Every registered entity gets CRUD routes plus a `schema` route describing
//! its presentation layout.

mod access;
pub mod builder;
pub mod entity_registry;
pub mod resource;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityDescriptor, EntityRegistry};
pub use resource::{EntityResource, ListParams, parse_id};
