//! Configuration loading and management

pub mod logging;

use crate::core::auth::{
    AccessGuard, AccessLevel, AccessPolicy, AuthProvider, DEFAULT_TOKEN_HEADER, DEFAULT_TOKEN_PARAM,
    Operation,
};
use crate::core::error::ConfigError;
use anyhow::Result;
use axum::http::HeaderName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Socket address built from host and port
    pub fn address(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Where guarded routes look for the access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_token_header")]
    pub token_header: String,

    /// Read when the header is absent
    #[serde(default = "default_token_param")]
    pub token_param: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_header: default_token_header(),
            token_param: default_token_param(),
        }
    }
}

impl SecurityConfig {
    /// Guard backed by `provider`, reading tokens where configured
    pub fn guard(&self, provider: Arc<dyn AuthProvider>) -> AccessGuard {
        AccessGuard::new(provider)
            .with_header(self.token_header.as_str())
            .with_query_param(self.token_param.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

/// Route name and access levels of an entity type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOverride {
    /// Singular form (e.g., "user", "company")
    pub singular: String,

    /// Plural form used as the route prefix (e.g., "users", "companies")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,

    /// Resource-wide access level, replacing the declared one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<AccessLevel>,

    /// Levels imposed on single operations, keyed by operation name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub overrides: IndexMap<String, AccessLevel>,
}

impl ResourceOverride {
    /// Apply the configured levels on top of the `declared` policy
    pub fn apply(&self, declared: AccessPolicy) -> AccessPolicy {
        let policy = match self.level {
            Some(level) => declared.with_level(level),
            None => declared,
        };
        self.overrides
            .iter()
            .filter_map(|(name, level)| Operation::from_name(name).map(|operation| (operation, *level)))
            .fold(policy, |policy, (operation, level)| {
                policy.override_operation(operation, level)
            })
    }
}

/// Complete framework configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub resources: Vec<ResourceOverride>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_token_header() -> String {
    DEFAULT_TOKEN_HEADER.to_string()
}

fn default_token_param() -> String {
    DEFAULT_TOKEN_PARAM.to_string()
}

impl FrameworkConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the types alone cannot rule out
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, name) in [
            ("security.token_header", &self.security.token_header),
            ("security.token_param", &self.security.token_param),
        ] {
            if name.trim().is_empty() {
                return Err(invalid(field, name, "must not be blank"));
            }
        }
        if HeaderName::from_bytes(self.security.token_header.as_bytes()).is_err() {
            return Err(invalid(
                "security.token_header",
                &self.security.token_header,
                "not a valid HTTP header name",
            ));
        }

        for resource in &self.resources {
            if let Some(plural) = &resource.plural {
                if plural.trim().is_empty() || plural.contains('/') {
                    return Err(invalid(
                        &format!("resources.{}.plural", resource.singular),
                        plural,
                        "must be a single non-blank path segment",
                    ));
                }
            }
            if let Some(name) = resource
                .overrides
                .keys()
                .find(|name| Operation::from_name(name).is_none())
            {
                return Err(invalid(
                    &format!("resources.{}.overrides", resource.singular),
                    name,
                    "expected one of list, schema, get, create, update, delete",
                ));
            }
        }
        Ok(())
    }

    /// Settings configured for `singular`, if any
    pub fn resource(&self, singular: &str) -> Option<&ResourceOverride> {
        self.resources
            .iter()
            .find(|resource| resource.singular == singular)
    }

    /// Route prefix configured for `singular`, if any
    pub fn plural_for(&self, singular: &str) -> Option<&str> {
        self.resource(singular)
            .and_then(|resource| resource.plural.as_deref())
    }
}

fn invalid(field: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}
