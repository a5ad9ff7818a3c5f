//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses are properly formatted
//! - Write-scope failures keep the conflict / failure distinction
//! - Error conversions work correctly

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use crudframe::core::error::{
    ConfigError, EntityError, FrameworkError, RequestError, StorageError, ValidationError,
};
use crudframe::core::field::FieldAccessError;
use crudframe::persistence::WriteError;
use crudframe::schema::SchemaError;
use serde_json::Value;

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_entity_not_found_returns_404() {
        let err = FrameworkError::Entity(EntityError::NotFound {
            entity_type: "User".to_string(),
            id: "12".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_entity_already_exists_returns_409() {
        let err = FrameworkError::Entity(EntityError::AlreadyExists {
            entity_type: "User".to_string(),
            message: "duplicate login".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_bad_input_returns_400() {
        let invalid_id = FrameworkError::Request(RequestError::InvalidEntityId {
            id: "abc".to_string(),
        });
        assert_eq!(invalid_id.status_code(), StatusCode::BAD_REQUEST);

        let field = FrameworkError::Validation(ValidationError::FieldError {
            field: "age".to_string(),
            message: "must be a number".to_string(),
        });
        assert_eq!(field.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_side_failures_return_500() {
        let failures = [
            FrameworkError::Entity(EntityError::OperationFailed {
                entity_type: "User".to_string(),
                operation: "save".to_string(),
                message: "disk full".to_string(),
            }),
            FrameworkError::Schema(SchemaError::DuplicateAttribute {
                entity: "User".to_string(),
                attribute: "name".to_string(),
            }),
            FrameworkError::Storage(StorageError::Unavailable {
                backend: "memory".to_string(),
            }),
            FrameworkError::Config(ConfigError::IoError {
                message: "missing".to_string(),
            }),
            FrameworkError::Internal("boom".to_string()),
        ];
        for err in failures {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR, "{}", err);
        }
    }
}

// =============================================================================
// Write Error Classification
// =============================================================================

mod write_error_tests {
    use super::*;

    #[test]
    fn test_constraint_violation_becomes_conflict() {
        let err: FrameworkError = EntityError::from_write(
            "Account",
            "save",
            WriteError::ConstraintViolation {
                constraint: "uk_login".to_string(),
                message: "duplicate login 'ada'".to_string(),
            },
        )
        .into();
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Account already exists: duplicate login 'ada'");
    }

    #[test]
    fn test_other_write_failure_is_operation_failure() {
        let err: FrameworkError =
            EntityError::from_write("Account", "delete", WriteError::failure("lock timeout")).into();
        assert!(!err.is_conflict());
        assert_eq!(err.error_code(), "ENTITY_OPERATION_FAILED");
        assert_eq!(err.to_string(), "Failed to delete Account: lock timeout");
    }

    #[test]
    fn test_bare_write_error_is_transaction_error() {
        let err: FrameworkError = WriteError::failure("commit refused").into();
        assert!(matches!(
            err,
            FrameworkError::Storage(StorageError::TransactionError { .. })
        ));
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }
}

// =============================================================================
// Error Response Tests
// =============================================================================

mod error_response_tests {
    use super::*;

    #[test]
    fn test_error_response_has_code_and_message() {
        let err = FrameworkError::Request(RequestError::InvalidBody {
            message: "missing field `name`".to_string(),
        });
        let response = err.to_response();
        assert_eq!(response.code, "INVALID_BODY");
        assert!(response.message.contains("missing field `name`"));
        assert!(response.details.is_none());
    }

    #[test]
    fn test_empty_lookup_has_no_id_in_message() {
        let err = FrameworkError::Entity(EntityError::NotFound {
            entity_type: "City".to_string(),
            id: String::new(),
        });
        let response = err.to_response();
        assert_eq!(response.message, "No City records found");
        assert_eq!(response.details.unwrap()["entity_type"], "City");
    }

    #[test]
    fn test_field_errors_include_field_details() {
        let err: FrameworkError = FieldAccessError::UnknownField {
            entity: "City".to_string(),
            field: "zip".to_string(),
        }
        .into();
        let response = err.to_response();
        assert_eq!(response.code, "VALIDATION_ERROR");
        assert_eq!(response.details.unwrap()["field"], "zip");
    }

    #[tokio::test]
    async fn test_into_response_writes_json_body() {
        let err = FrameworkError::Entity(EntityError::AlreadyExists {
            entity_type: "User".to_string(),
            message: "duplicate login".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "ENTITY_ALREADY_EXISTS");
        assert_eq!(body["details"]["entity_type"], "User");
    }
}

// =============================================================================
// Error Conversion Tests
// =============================================================================

mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_serde_json_error_is_invalid_json() {
        let json_err = serde_json::from_str::<Value>("{ nope").unwrap_err();
        let err: FrameworkError = json_err.into();
        assert!(matches!(
            err,
            FrameworkError::Validation(ValidationError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_yaml_error_is_config_parse_error() {
        let yaml_err = serde_yaml::from_str::<Value>("a: [b").unwrap_err();
        let err: FrameworkError = yaml_err.into();
        assert!(matches!(
            err,
            FrameworkError::Config(ConfigError::ParseError { file: None, .. })
        ));
    }

    #[test]
    fn test_anyhow_error_is_internal() {
        let err: FrameworkError = anyhow::anyhow!("unexpected").into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(err.to_string(), "Internal error: unexpected");
    }

    #[test]
    fn test_schema_error_keeps_its_source() {
        let err: FrameworkError = SchemaError::UnnamedAttribute {
            entity: "Broken".to_string(),
        }
        .into();
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("Broken"));
    }
}
