//! Typed error handling for the crudframe framework
//!
//! Callers match on a specific category instead of inspecting a generic
//! `anyhow::Error`. The distinction the save path cares about is kept all
//! the way to the HTTP boundary: a uniqueness conflict is
//! [`EntityError::AlreadyExists`], an empty lookup is
//! [`EntityError::NotFound`], anything else that went wrong while reading or
//! writing is [`EntityError::OperationFailed`].
//!
//! # Error Categories
//!
//! - [`EntityError`]: Errors related to entity operations (CRUD)
//! - [`SchemaError`]: Schema generation failures
//! - [`ConfigError`]: Errors related to configuration parsing
//! - [`ValidationError`]: Errors related to input validation
//! - [`StorageError`]: Errors related to the write scope / store
//! - [`RequestError`]: Malformed HTTP requests
//! - [`AuthError`]: Missing or rejected access tokens
//!
//! # Example
//!
//! ```rust,ignore
//! match service.add(user).await {
//!     Ok(saved) => println!("Saved: {:?}", saved),
//!     Err(FrameworkError::Entity(EntityError::AlreadyExists { message, .. })) => {
//!         println!("Conflict: {}", message);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use crate::core::auth::AccessLevel;
use crate::core::field::FieldAccessError;
use crate::persistence::scope::WriteError;
pub use crate::schema::generator::SchemaError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type for the framework
#[derive(Debug)]
pub enum FrameworkError {
    /// Entity-related errors (CRUD operations)
    Entity(EntityError),

    /// Schema generation failed
    Schema(SchemaError),

    /// Configuration errors
    Config(ConfigError),

    /// Validation errors
    Validation(ValidationError),

    /// Storage errors not tied to one entity operation
    Storage(StorageError),

    /// HTTP/Request errors
    Request(RequestError),

    /// Authentication and authorization errors
    Auth(AuthError),

    /// Internal framework errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameworkError::Entity(e) => write!(f, "{}", e),
            FrameworkError::Schema(e) => write!(f, "Schema generation failed: {}", e),
            FrameworkError::Config(e) => write!(f, "{}", e),
            FrameworkError::Validation(e) => write!(f, "{}", e),
            FrameworkError::Storage(e) => write!(f, "{}", e),
            FrameworkError::Request(e) => write!(f, "{}", e),
            FrameworkError::Auth(e) => write!(f, "{}", e),
            FrameworkError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for FrameworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameworkError::Entity(e) => Some(e),
            FrameworkError::Schema(e) => Some(e),
            FrameworkError::Config(e) => Some(e),
            FrameworkError::Validation(e) => Some(e),
            FrameworkError::Storage(e) => Some(e),
            FrameworkError::Request(e) => Some(e),
            FrameworkError::Auth(e) => Some(e),
            FrameworkError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl FrameworkError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            FrameworkError::Entity(e) => e.status_code(),
            FrameworkError::Schema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FrameworkError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FrameworkError::Validation(_) => StatusCode::BAD_REQUEST,
            FrameworkError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FrameworkError::Request(e) => e.status_code(),
            FrameworkError::Auth(e) => e.status_code(),
            FrameworkError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            FrameworkError::Entity(e) => e.error_code(),
            FrameworkError::Schema(_) => "SCHEMA_ERROR",
            FrameworkError::Config(_) => "CONFIG_ERROR",
            FrameworkError::Validation(_) => "VALIDATION_ERROR",
            FrameworkError::Storage(_) => "STORAGE_ERROR",
            FrameworkError::Request(e) => e.error_code(),
            FrameworkError::Auth(e) => e.error_code(),
            FrameworkError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for the uniqueness-conflict kind
    pub fn is_conflict(&self) -> bool {
        matches!(self, FrameworkError::Entity(EntityError::AlreadyExists { .. }))
    }

    /// True for the empty-lookup kind
    pub fn is_not_found(&self) -> bool {
        matches!(self, FrameworkError::Entity(EntityError::NotFound { .. }))
    }

    /// Classify a write-scope failure for `operation` on `entity_type`
    ///
    /// Query text the store cannot parse is the caller's fault and becomes
    /// [`RequestError::InvalidQuery`]; everything else goes through
    /// [`EntityError::from_write`].
    pub fn from_write(entity_type: &str, operation: &str, err: WriteError) -> Self {
        match err {
            WriteError::InvalidQuery { query, message } => {
                FrameworkError::Request(RequestError::InvalidQuery {
                    message: format!("'{}': {}", query, message),
                })
            }
            other => FrameworkError::Entity(EntityError::from_write(entity_type, operation, other)),
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            FrameworkError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id
                }))
            }
            FrameworkError::Entity(EntityError::AlreadyExists { entity_type, .. }) => {
                Some(serde_json::json!({ "entity_type": entity_type }))
            }
            FrameworkError::Validation(ValidationError::FieldError { field, .. }) => {
                Some(serde_json::json!({ "field": field }))
            }
            FrameworkError::Auth(AuthError::PermissionDenied { required, .. }) => {
                Some(serde_json::json!({ "required": required }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for FrameworkError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity operations
#[derive(Debug)]
pub enum EntityError {
    /// Nothing matched the lookup
    NotFound { entity_type: String, id: String },

    /// A uniqueness constraint rejected the write
    AlreadyExists {
        entity_type: String,
        message: String,
    },

    /// Failed to serialize/deserialize entity
    SerializationError {
        entity_type: String,
        message: String,
    },

    /// Entity operation failed
    OperationFailed {
        entity_type: String,
        operation: String,
        message: String,
    },
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::NotFound { entity_type, id } if id.is_empty() => {
                write!(f, "No {} records found", entity_type)
            }
            EntityError::NotFound { entity_type, id } => {
                write!(f, "{} with id '{}' not found", entity_type, id)
            }
            EntityError::AlreadyExists {
                entity_type,
                message,
            } => {
                write!(f, "{} already exists: {}", entity_type, message)
            }
            EntityError::SerializationError {
                entity_type,
                message,
            } => {
                write!(
                    f,
                    "Failed to serialize/deserialize {}: {}",
                    entity_type, message
                )
            }
            EntityError::OperationFailed {
                entity_type,
                operation,
                message,
            } => {
                write!(f, "Failed to {} {}: {}", operation, entity_type, message)
            }
        }
    }
}

impl std::error::Error for EntityError {}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } => StatusCode::CONFLICT,
            EntityError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            EntityError::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
            EntityError::SerializationError { .. } => "ENTITY_SERIALIZATION_ERROR",
            EntityError::OperationFailed { .. } => "ENTITY_OPERATION_FAILED",
        }
    }

    /// Classify a write-scope failure for `operation` on `entity_type`
    pub fn from_write(entity_type: &str, operation: &str, err: WriteError) -> Self {
        match err {
            WriteError::ConstraintViolation { message, .. } => EntityError::AlreadyExists {
                entity_type: entity_type.to_string(),
                message,
            },
            other => EntityError::OperationFailed {
                entity_type: entity_type.to_string(),
                operation: operation.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<EntityError> for FrameworkError {
    fn from(err: EntityError) -> Self {
        FrameworkError::Entity(err)
    }
}

impl From<SchemaError> for FrameworkError {
    fn from(err: SchemaError) -> Self {
        FrameworkError::Schema(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for FrameworkError {
    fn from(err: ConfigError) -> Self {
        FrameworkError::Config(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// Single field validation error
    FieldError { field: String, message: String },

    /// Invalid JSON format
    InvalidJson { message: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FieldError { field, message } => {
                write!(f, "Validation error for field '{}': {}", field, message)
            }
            ValidationError::InvalidJson { message } => {
                write!(f, "Invalid JSON: {}", message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for FrameworkError {
    fn from(err: ValidationError) -> Self {
        FrameworkError::Validation(err)
    }
}

impl From<FieldAccessError> for FrameworkError {
    fn from(err: FieldAccessError) -> Self {
        let field = match &err {
            FieldAccessError::UnknownField { field, .. } => field.clone(),
            FieldAccessError::TypeMismatch { field, .. } => field.clone(),
            FieldAccessError::OutOfRange { field, .. } => field.clone(),
        };
        FrameworkError::Validation(ValidationError::FieldError {
            field,
            message: err.to_string(),
        })
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to the write scope and its backing store
#[derive(Debug)]
pub enum StorageError {
    /// Begin / commit / rollback failed
    TransactionError { message: String },

    /// No write scope could be acquired
    Unavailable { backend: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::TransactionError { message } => {
                write!(f, "Transaction error: {}", message)
            }
            StorageError::Unavailable { backend } => {
                write!(f, "Storage backend '{}' is unavailable", backend)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for FrameworkError {
    fn from(err: StorageError) -> Self {
        FrameworkError::Storage(err)
    }
}

impl From<WriteError> for FrameworkError {
    fn from(err: WriteError) -> Self {
        FrameworkError::Storage(StorageError::TransactionError {
            message: err.to_string(),
        })
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to HTTP requests
#[derive(Debug)]
pub enum RequestError {
    /// Invalid entity ID format
    InvalidEntityId { id: String },

    /// Invalid request body
    InvalidBody { message: String },

    /// Invalid paging or query parameters
    InvalidQuery { message: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidEntityId { id } => {
                write!(f, "Invalid entity ID format: '{}'", id)
            }
            RequestError::InvalidBody { message } => {
                write!(f, "Invalid request body: {}", message)
            }
            RequestError::InvalidQuery { message } => {
                write!(f, "Invalid query: {}", message)
            }
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::InvalidEntityId { .. } => "INVALID_ENTITY_ID",
            RequestError::InvalidBody { .. } => "INVALID_BODY",
            RequestError::InvalidQuery { .. } => "INVALID_QUERY",
        }
    }
}

impl From<RequestError> for FrameworkError {
    fn from(err: RequestError) -> Self {
        FrameworkError::Request(err)
    }
}

// =============================================================================
// Auth Errors
// =============================================================================

/// Errors raised while guarding a resource operation
#[derive(Debug)]
pub enum AuthError {
    /// The operation has an access level and no token was presented
    MissingToken,

    /// The token is malformed or not recognised
    InvalidToken,

    /// The caller's level is below the level of the operation
    PermissionDenied {
        required: AccessLevel,
        granted: AccessLevel,
    },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => {
                write!(f, "An access token must be declared on the http header")
            }
            AuthError::InvalidToken => write!(f, "Invalid access token"),
            AuthError::PermissionDenied { .. } => write!(f, "Permission Denied"),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_ACCESS_TOKEN",
            AuthError::InvalidToken => "INVALID_ACCESS_TOKEN",
            AuthError::PermissionDenied { .. } => "PERMISSION_DENIED",
        }
    }
}

impl From<AuthError> for FrameworkError {
    fn from(err: AuthError) -> Self {
        FrameworkError::Auth(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for FrameworkError {
    fn from(err: serde_json::Error) -> Self {
        FrameworkError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for FrameworkError {
    fn from(err: std::io::Error) -> Self {
        FrameworkError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for FrameworkError {
    fn from(err: serde_yaml::Error) -> Self {
        FrameworkError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for FrameworkError {
    fn from(err: anyhow::Error) -> Self {
        FrameworkError::Internal(err.to_string())
    }
}

/// A specialized Result type for framework operations
pub type FrameworkResult<T> = Result<T, FrameworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_error_display() {
        let err = EntityError::NotFound {
            entity_type: "User".to_string(),
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "User with id '42' not found");

        let empty = EntityError::NotFound {
            entity_type: "User".to_string(),
            id: String::new(),
        };
        assert_eq!(empty.to_string(), "No User records found");
    }

    #[test]
    fn test_entity_error_status_code() {
        let err = EntityError::NotFound {
            entity_type: "User".to_string(),
            id: "1".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = EntityError::AlreadyExists {
            entity_type: "User".to_string(),
            message: "login".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_write_error_classification() {
        let conflict = EntityError::from_write(
            "User",
            "save",
            WriteError::ConstraintViolation {
                constraint: "login".to_string(),
                message: "duplicate login".to_string(),
            },
        );
        assert_eq!(conflict.error_code(), "ENTITY_ALREADY_EXISTS");

        let failure = EntityError::from_write("User", "save", WriteError::failure("disk full"));
        assert_eq!(failure.error_code(), "ENTITY_OPERATION_FAILED");
        assert!(failure.to_string().contains("disk full"));
    }

    #[test]
    fn test_unparseable_query_is_bad_request() {
        let err = FrameworkError::from_write(
            "User",
            "query",
            WriteError::InvalidQuery {
                query: "login 'ann'".to_string(),
                message: "expected '='".to_string(),
            },
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_QUERY");
        assert!(err.to_string().contains("expected '='"));

        let failure = FrameworkError::from_write("User", "query", WriteError::failure("refused"));
        assert_eq!(failure.error_code(), "ENTITY_OPERATION_FAILED");
    }

    #[test]
    fn test_auth_error_status_codes() {
        let missing: FrameworkError = AuthError::MissingToken.into();
        assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(missing.error_code(), "MISSING_ACCESS_TOKEN");

        let denied: FrameworkError = AuthError::PermissionDenied {
            required: AccessLevel::High,
            granted: AccessLevel::Low,
        }
        .into();
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(denied.to_string(), "Permission Denied");
        assert_eq!(denied.to_response().details.unwrap()["required"], "HIGH");
    }

    #[test]
    fn test_framework_error_conversion() {
        let err: FrameworkError = EntityError::NotFound {
            entity_type: "User".to_string(),
            id: "7".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_error_response_serialization() {
        let err = FrameworkError::Entity(EntityError::NotFound {
            entity_type: "User".to_string(),
            id: "7".to_string(),
        });
        let response = err.to_response();
        assert_eq!(response.code, "ENTITY_NOT_FOUND");
        assert_eq!(response.details.unwrap()["id"], "7");
    }

    #[test]
    fn test_schema_error_is_server_error() {
        let err: FrameworkError = SchemaError::UnnamedAttribute {
            entity: "User".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "SCHEMA_ERROR");
    }

    #[test]
    fn test_field_access_error_is_bad_request() {
        let err: FrameworkError = FieldAccessError::TypeMismatch {
            field: "age".to_string(),
            expected: "integer",
            actual: "string",
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            err,
            FrameworkError::Validation(ValidationError::FieldError { ref field, .. }) if field == "age"
        ));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: FrameworkError = json_err.into();
        assert!(matches!(
            err,
            FrameworkError::Validation(ValidationError::InvalidJson { .. })
        ));
    }
}
