//! Access levels and token authorization
//!
//! Every resource operation resolves to an [`AccessLevel`] through the
//! resource's [`AccessPolicy`]:
//! - a level imposed by the owner on one operation wins
//! - then a level declared on the operation itself
//! - then the level of the whole resource
//! - otherwise [`AccessLevel::None`], which is free access
//!
//! Any other level needs a token. The [`AccessGuard`] validates the token
//! against its [`TokenGenerator`] pattern, asks the [`AuthProvider`] which
//! level the bearer holds and grants the call when that level is high enough.

use crate::core::error::{AuthError, FrameworkResult};
use crate::security::token::{Token, TokenGenerator, UuidTokenGenerator};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Header carrying the access token unless configured otherwise
pub const DEFAULT_TOKEN_HEADER: &str = "X-Access-Token";

/// Query parameter read when the header is absent
pub const DEFAULT_TOKEN_PARAM: &str = "access_token";

/// Level required to run an operation, ordered from free to total access
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    #[default]
    None,
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
    Total,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown access level '{0}'")]
pub struct UnknownAccessLevel(pub String);

impl AccessLevel {
    pub const ALL: [AccessLevel; 7] = [
        AccessLevel::None,
        AccessLevel::VeryLow,
        AccessLevel::Low,
        AccessLevel::Medium,
        AccessLevel::High,
        AccessLevel::VeryHigh,
        AccessLevel::Total,
    ];

    /// Numeric rank: -1 for `None` up to 5 for `Total`
    pub fn rank(self) -> i8 {
        match self {
            AccessLevel::None => -1,
            AccessLevel::VeryLow => 0,
            AccessLevel::Low => 1,
            AccessLevel::Medium => 2,
            AccessLevel::High => 3,
            AccessLevel::VeryHigh => 4,
            AccessLevel::Total => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AccessLevel::None => "NONE",
            AccessLevel::VeryLow => "VERY_LOW",
            AccessLevel::Low => "LOW",
            AccessLevel::Medium => "MEDIUM",
            AccessLevel::High => "HIGH",
            AccessLevel::VeryHigh => "VERY_HIGH",
            AccessLevel::Total => "TOTAL",
        }
    }

    /// No token is needed
    pub fn is_free(self) -> bool {
        self == AccessLevel::None
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts names in any case with `-`, `_` or space separators, or a rank
impl FromStr for AccessLevel {
    type Err = UnknownAccessLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized = trimmed.to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|level| level.name() == normalized || level.rank().to_string() == trimmed)
            .ok_or_else(|| UnknownAccessLevel(s.to_string()))
    }
}

/// Operations a resource exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    List,
    Schema,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::List,
        Operation::Schema,
        Operation::Get,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Schema => "schema",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Access levels of one resource and its operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    level: AccessLevel,
    operations: HashMap<Operation, AccessLevel>,
    overrides: HashMap<Operation, AccessLevel>,
}

impl AccessPolicy {
    /// Every operation requires `level` unless declared otherwise
    pub fn new(level: AccessLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Free access for every operation
    pub fn free() -> Self {
        Self::default()
    }

    /// Replace the resource-wide level
    pub fn with_level(mut self, level: AccessLevel) -> Self {
        self.level = level;
        self
    }

    /// Declare the level of one operation
    pub fn operation(mut self, operation: Operation, level: AccessLevel) -> Self {
        self.operations.insert(operation, level);
        self
    }

    /// Impose a level on one operation, ahead of anything declared
    pub fn override_operation(mut self, operation: Operation, level: AccessLevel) -> Self {
        self.overrides.insert(operation, level);
        self
    }

    pub fn level(&self) -> AccessLevel {
        self.level
    }

    /// Level required to run `operation`
    pub fn resolve(&self, operation: Operation) -> AccessLevel {
        self.overrides
            .get(&operation)
            .or_else(|| self.operations.get(&operation))
            .copied()
            .unwrap_or(self.level)
    }

    pub fn is_free(&self) -> bool {
        Operation::ALL
            .into_iter()
            .all(|operation| self.resolve(operation).is_free())
    }
}

/// Caller of a guarded operation
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AuthContext {
    /// A token was presented and accepted
    Bearer { token: Token, level: AccessLevel },

    /// The operation needed no token
    #[default]
    Anonymous,
}

impl AuthContext {
    /// Level held by the caller; `None` when anonymous
    pub fn level(&self) -> AccessLevel {
        match self {
            AuthContext::Bearer { level, .. } => *level,
            AuthContext::Anonymous => AccessLevel::None,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        match self {
            AuthContext::Bearer { token, .. } => Some(token),
            AuthContext::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, AuthContext::Anonymous)
    }
}

/// Source of the level held by a token bearer
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Level granted to the bearer of `token`; `None` rejects the token
    async fn authenticate(&self, token: &Token) -> Result<Option<AccessLevel>>;

    /// Whether `context` may run an operation requiring `required`
    fn should_grant(&self, context: &AuthContext, required: AccessLevel) -> bool {
        context.level() >= required
    }
}

/// Tokens issued by this process and kept in memory
///
/// Cloning is cheap; clones share the issued tokens.
#[derive(Clone)]
pub struct IssuedTokens {
    generator: Arc<dyn TokenGenerator>,
    granted: Arc<RwLock<HashMap<String, AccessLevel>>>,
}

impl IssuedTokens {
    pub fn new(generator: Arc<dyn TokenGenerator>) -> Self {
        Self {
            generator,
            granted: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Generate a fresh token granting `level`
    pub fn issue(&self, level: AccessLevel) -> Result<Token> {
        let token = self.generator.generate();
        self.granted
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?
            .insert(token.value().to_string(), level);
        tracing::debug!(level = %level, "Issued access token");
        Ok(token)
    }

    /// Forget `token`; false if it was never issued
    pub fn revoke(&self, token: &Token) -> Result<bool> {
        Ok(self
            .granted
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?
            .remove(token.value())
            .is_some())
    }
}

impl Default for IssuedTokens {
    fn default() -> Self {
        Self::new(Arc::new(UuidTokenGenerator))
    }
}

#[async_trait]
impl AuthProvider for IssuedTokens {
    async fn authenticate(&self, token: &Token) -> Result<Option<AccessLevel>> {
        let granted = self
            .granted
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(granted.get(token.value()).copied())
    }
}

/// Token check run in front of every guarded operation
#[derive(Clone)]
pub struct AccessGuard {
    provider: Arc<dyn AuthProvider>,
    tokens: Arc<dyn TokenGenerator>,
    header: String,
    query_param: String,
}

impl AccessGuard {
    /// Guard backed by `provider`, accepting UUID tokens
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            tokens: Arc::new(UuidTokenGenerator),
            header: DEFAULT_TOKEN_HEADER.to_string(),
            query_param: DEFAULT_TOKEN_PARAM.to_string(),
        }
    }

    /// Validate presented values against `tokens`' pattern
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenGenerator>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>) -> Self {
        self.query_param = name.into();
        self
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn query_param(&self) -> &str {
        &self.query_param
    }

    /// Authenticate the `presented` value and authorize it for `required`
    pub async fn check(
        &self,
        presented: Option<&str>,
        required: AccessLevel,
    ) -> FrameworkResult<AuthContext> {
        if required.is_free() {
            return Ok(AuthContext::Anonymous);
        }

        let raw = presented
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let token = self
            .tokens
            .generate_from(raw)
            .ok_or(AuthError::InvalidToken)?;
        let level = self
            .provider
            .authenticate(&token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let context = AuthContext::Bearer { token, level };
        if !self.provider.should_grant(&context, required) {
            return Err(AuthError::PermissionDenied {
                required,
                granted: level,
            }
            .into());
        }
        Ok(context)
    }
}

impl fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("header", &self.header)
            .field("query_param", &self.query_param)
            .field("pattern", &self.tokens.pattern())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FrameworkError;

    #[test]
    fn test_levels_are_ordered_by_rank() {
        assert!(AccessLevel::None < AccessLevel::VeryLow);
        assert!(AccessLevel::High < AccessLevel::Total);
        assert_eq!(AccessLevel::None.rank(), -1);
        assert_eq!(AccessLevel::Total.rank(), 5);
        assert_eq!(AccessLevel::default(), AccessLevel::None);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("very-high".parse::<AccessLevel>(), Ok(AccessLevel::VeryHigh));
        assert_eq!("Medium".parse::<AccessLevel>(), Ok(AccessLevel::Medium));
        assert_eq!("-1".parse::<AccessLevel>(), Ok(AccessLevel::None));
        assert!("root".parse::<AccessLevel>().is_err());
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::from_name("DELETE"), Some(Operation::Delete));
        assert_eq!(Operation::from_name("purge"), None);
        assert_eq!(Operation::Schema.to_string(), "schema");
    }

    #[test]
    fn test_resolve_prefers_override_then_operation_then_resource() {
        let policy = AccessPolicy::new(AccessLevel::Low)
            .operation(Operation::Delete, AccessLevel::High)
            .operation(Operation::Get, AccessLevel::None)
            .override_operation(Operation::Delete, AccessLevel::Total);

        assert_eq!(policy.resolve(Operation::Delete), AccessLevel::Total);
        assert_eq!(policy.resolve(Operation::Get), AccessLevel::None);
        assert_eq!(policy.resolve(Operation::Create), AccessLevel::Low);
        assert!(!policy.is_free());
        assert!(AccessPolicy::free().is_free());
    }

    #[test]
    fn test_anonymous_context() {
        let context = AuthContext::default();
        assert!(context.is_anonymous());
        assert_eq!(context.level(), AccessLevel::None);
        assert!(context.token().is_none());
    }

    #[tokio::test]
    async fn test_issued_tokens_authenticate_and_revoke() {
        let tokens = IssuedTokens::default();
        let token = tokens.issue(AccessLevel::Medium).unwrap();

        assert_eq!(tokens.authenticate(&token).await.unwrap(), Some(AccessLevel::Medium));
        assert!(tokens.revoke(&token).unwrap());
        assert_eq!(tokens.authenticate(&token).await.unwrap(), None);
        assert!(!tokens.revoke(&token).unwrap());
    }

    #[tokio::test]
    async fn test_guard_check() {
        let tokens = IssuedTokens::default();
        let low = tokens.issue(AccessLevel::Low).unwrap();
        let guard = AccessGuard::new(Arc::new(tokens));

        let free = guard.check(None, AccessLevel::None).await.unwrap();
        assert!(free.is_anonymous());

        let err = guard.check(Some("  "), AccessLevel::Low).await.unwrap_err();
        assert!(matches!(err, FrameworkError::Auth(AuthError::MissingToken)));

        let err = guard.check(Some("not-a-uuid"), AccessLevel::Low).await.unwrap_err();
        assert!(matches!(err, FrameworkError::Auth(AuthError::InvalidToken)));

        let stranger = uuid::Uuid::new_v4().to_string();
        let err = guard.check(Some(&stranger), AccessLevel::Low).await.unwrap_err();
        assert!(matches!(err, FrameworkError::Auth(AuthError::InvalidToken)));

        let err = guard.check(Some(low.value()), AccessLevel::High).await.unwrap_err();
        assert!(matches!(
            err,
            FrameworkError::Auth(AuthError::PermissionDenied {
                required: AccessLevel::High,
                granted: AccessLevel::Low,
            })
        ));

        let context = guard.check(Some(low.value()), AccessLevel::Low).await.unwrap();
        assert_eq!(context.level(), AccessLevel::Low);
        assert_eq!(context.token(), Some(&low));
    }

    struct Strict;

    #[async_trait]
    impl AuthProvider for Strict {
        async fn authenticate(&self, _token: &Token) -> Result<Option<AccessLevel>> {
            Ok(Some(AccessLevel::Total))
        }

        fn should_grant(&self, _context: &AuthContext, _required: AccessLevel) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_provider_can_refuse_any_level() {
        let guard = AccessGuard::new(Arc::new(Strict));
        let token = uuid::Uuid::new_v4().to_string();
        let err = guard.check(Some(&token), AccessLevel::VeryLow).await.unwrap_err();
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
    }
}
