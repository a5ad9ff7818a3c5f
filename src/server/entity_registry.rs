//! Entity registry collecting REST resources and merging their routes

use crate::core::auth::AccessGuard;
use axum::Router;
use indexmap::IndexMap;

/// How one entity exposes itself over HTTP
pub trait EntityDescriptor: Send + Sync {
    /// The entity type name (singular, e.g., "user")
    fn entity_type(&self) -> &str;

    /// The plural form used as the route prefix (e.g., "users")
    fn plural(&self) -> &str;

    /// Some operation requires an access level
    fn is_guarded(&self) -> bool {
        false
    }

    /// Build the routes for this entity, checking tokens with `guard`
    ///
    /// - GET /{plural}
    /// - GET /{plural}/schema
    /// - POST /{plural}
    /// - GET, PUT, DELETE /{plural}/{id}
    fn build_routes(&self, guard: Option<&AccessGuard>) -> Router;
}

/// Registry of every exposed entity, in registration order
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: IndexMap<String, Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: IndexMap::new(),
        }
    }

    /// Register an entity descriptor, replacing one with the same type name
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        let entity_type = descriptor.entity_type().to_string();
        tracing::debug!(entity = %entity_type, plural = descriptor.plural(), "Registered resource");
        self.descriptors.insert(entity_type, descriptor);
    }

    /// Merge the routes of every registered entity
    pub fn build_routes(&self, guard: Option<&AccessGuard>) -> Router {
        self.descriptors
            .values()
            .fold(Router::new(), |router, descriptor| {
                if guard.is_none() && descriptor.is_guarded() {
                    tracing::warn!(
                        entity = descriptor.entity_type(),
                        "Resource requires access levels but no access guard is installed; guarded operations will be refused"
                    );
                }
                router.merge(descriptor.build_routes(guard))
            })
    }

    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    /// Route prefix of `entity_type`, if registered
    pub fn plural_of(&self, entity_type: &str) -> Option<&str> {
        self.descriptors.get(entity_type).map(|d| d.plural())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
