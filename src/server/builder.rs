//! ServerBuilder for fluent API to build HTTP servers

use super::entity_registry::{EntityDescriptor, EntityRegistry};
use super::resource::EntityResource;
use crate::config::FrameworkConfig;
use crate::config::logging::init_tracing;
use crate::core::auth::{AccessGuard, AuthProvider};
use crate::core::entity::Entity;
use anyhow::Result;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Builder for creating HTTP servers from registered entity resources
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .register_resource(EntityResource::new(user_service))
///     .build();
/// ```
pub struct ServerBuilder {
    entity_registry: EntityRegistry,
    custom_routes: Vec<Router>,
    config: FrameworkConfig,
    guard: Option<AccessGuard>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            entity_registry: EntityRegistry::new(),
            custom_routes: Vec::new(),
            config: FrameworkConfig::default(),
            guard: None,
        }
    }

    /// Start from a loaded configuration, installing its logging filter
    pub fn from_config(config: FrameworkConfig) -> Self {
        init_tracing(&config.logging.filter);
        Self {
            config,
            ..Self::new()
        }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.entity_registry
    }

    /// Check tokens of guarded operations with `guard`
    pub fn with_access_guard(mut self, guard: AccessGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Check tokens against `provider`, reading them where the config says
    pub fn with_auth_provider(self, provider: Arc<dyn AuthProvider>) -> Self {
        let guard = self.config.security.guard(provider);
        self.with_access_guard(guard)
    }

    /// Expose an entity, honouring configured route name and access levels
    pub fn register_resource<T: Entity>(mut self, resource: EntityResource<T>) -> Self {
        let resource = match self.config.resource(T::resource_name_singular()) {
            Some(configured) => {
                let access = configured.apply(resource.access().clone());
                let resource = resource.with_access(access);
                match &configured.plural {
                    Some(plural) => resource.with_plural(plural.as_str()),
                    None => resource,
                }
            }
            None => resource,
        };
        self.entity_registry.register(Box::new(resource));
        self
    }

    /// Register any other entity descriptor as is
    pub fn register_descriptor(mut self, descriptor: Box<dyn EntityDescriptor>) -> Self {
        self.entity_registry.register(descriptor);
        self
    }

    /// Add routes that don't fit the CRUD pattern
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the final REST router
    ///
    /// - `/health`
    /// - CRUD and schema routes for all registered entities
    /// - custom routes
    pub fn build(self) -> Router {
        let mut app = Router::new()
            .route("/health", get(health_check))
            .merge(self.entity_registry.build_routes(self.guard.as_ref()));

        for custom_router in self.custom_routes {
            app = app.merge(custom_router);
        }

        app.layer(TraceLayer::new_for_http())
    }

    /// Serve the application with graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on the configured host and port
    pub async fn serve_configured(self) -> Result<()> {
        let addr = self.config.server.address()?.to_string();
        self.serve(&addr).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "crudframe"
    }))
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Couldn't install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Couldn't install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
