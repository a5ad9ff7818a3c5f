//! Opaque access tokens

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A token value with the pattern it must match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    value: String,
    #[serde(skip, default = "any_pattern")]
    pattern: String,
}

fn any_pattern() -> String {
    ".*".to_string()
}

impl Token {
    pub fn new(value: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            pattern: pattern.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The whole value matches the pattern; an invalid pattern matches nothing
    pub fn is_valid(&self) -> bool {
        Regex::new(&format!("^(?:{})$", self.pattern))
            .map(|regex| regex.is_match(&self.value))
            .unwrap_or(false)
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new("", any_pattern())
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Source of new tokens
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> Token;

    /// Wrap an existing value, or `None` if it does not match the pattern
    fn generate_from(&self, value: &str) -> Option<Token> {
        let token = Token::new(value, self.pattern());
        token.is_valid().then_some(token)
    }

    fn pattern(&self) -> &str;
}

/// Random v4 UUID tokens
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidTokenGenerator;

impl TokenGenerator for UuidTokenGenerator {
    fn generate(&self) -> Token {
        Token::new(uuid::Uuid::new_v4().to_string(), self.pattern())
    }

    fn pattern(&self) -> &str {
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
    }
}
