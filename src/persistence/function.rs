//! Query functions resolved before a query reaches the write scope
//!
//! A query may call `#encrypt(value)`; the call is replaced by the digest of
//! `value` under the algorithm declared on the entity's encryption marker.
//! Resolution fails closed: when a call cannot be resolved the whole query is
//! replaced by [`QUERY_REPLACED_SENTINEL`], which no store accepts.

use crate::schema::descriptor::TypeDescriptor;
use crate::security::algorithm::Encrypter;
use thiserror::Error;

/// Replacement text for a query whose functions could not be resolved
pub const QUERY_REPLACED_SENTINEL: &str =
    "[ENCRYPTION_FAILED] - For system safety, the query has been replaced";

/// Failure while resolving one function call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FunctionError {
    #[error("'{function}' at {position} is not followed by '('")]
    MissingArgumentList {
        function: &'static str,
        position: usize,
    },

    #[error("argument of '{function}' at {position} is not terminated")]
    UnterminatedArgument {
        function: &'static str,
        position: usize,
    },
}

/// Functions recognised in query text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFunction {
    /// Digest the argument with the entity's encryption algorithm
    Encrypt,
}

impl QueryFunction {
    pub const ALL: [QueryFunction; 1] = [QueryFunction::Encrypt];

    pub fn identifier(&self) -> &'static str {
        match self {
            QueryFunction::Encrypt => "#encrypt",
        }
    }

    pub fn strategy(&self) -> &'static dyn FunctionStrategy {
        match self {
            QueryFunction::Encrypt => &EncryptFunctionStrategy,
        }
    }
}

/// Resolution of one function call inside a query
pub trait FunctionStrategy: Send + Sync {
    /// Whether the call at `index` can be resolved for `descriptor`
    fn is_valid(&self, query: &str, index: usize, descriptor: &TypeDescriptor) -> bool;

    /// Resolve the call at `index`; an invalid call leaves `query` unchanged
    fn handle(
        &self,
        query: &str,
        index: usize,
        descriptor: &TypeDescriptor,
    ) -> Result<String, FunctionError>;
}

/// Strategy behind `#encrypt(...)`
#[derive(Debug, Default, Clone, Copy)]
pub struct EncryptFunctionStrategy;

impl FunctionStrategy for EncryptFunctionStrategy {
    fn is_valid(&self, query: &str, index: usize, descriptor: &TypeDescriptor) -> bool {
        let identifier = QueryFunction::Encrypt.identifier();
        descriptor.encryption_marker().is_some()
            && !query.trim().is_empty()
            && index + identifier.len() + 3 <= query.len()
    }

    fn handle(
        &self,
        query: &str,
        index: usize,
        descriptor: &TypeDescriptor,
    ) -> Result<String, FunctionError> {
        let Some(algorithm) = descriptor.encryption_marker() else {
            return Ok(query.to_string());
        };
        if !self.is_valid(query, index, descriptor) {
            return Ok(query.to_string());
        }

        let function = QueryFunction::Encrypt.identifier();
        let open = index + function.len();
        if query[open..].chars().next() != Some('(') {
            return Err(FunctionError::MissingArgumentList {
                function,
                position: index,
            });
        }

        let close = matching_close(query, open).ok_or(FunctionError::UnterminatedArgument {
            function,
            position: index,
        })?;

        let argument = &query[open + 1..close];
        let encrypted = Encrypter::new(algorithm).encrypt(argument);

        Ok(format!("{}{}{}", &query[..index], encrypted, &query[close + 1..]))
    }
}

/// Byte offset of the `)` balancing the `(` at `open`
fn matching_close(query: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in query[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolve every function call in `query` for the entity `descriptor`
///
/// Returns the query unchanged when it calls no function or when a call is
/// not applicable (no encryption marker on the entity). Returns
/// [`QUERY_REPLACED_SENTINEL`] when a call fails to resolve.
pub fn resolve_query_functions(query: &str, descriptor: &TypeDescriptor) -> String {
    if query.trim().is_empty() {
        return query.to_string();
    }

    let mut resolved = query.to_string();
    for function in QueryFunction::ALL {
        while let Some(index) = resolved.find(function.identifier()) {
            match function.strategy().handle(&resolved, index, descriptor) {
                Ok(next) if next == resolved => break,
                Ok(next) => resolved = next,
                Err(e) => {
                    tracing::warn!(
                        function = function.identifier(),
                        entity = descriptor.simple_name(),
                        error = %e,
                        "Couldn't resolve query function, replacing query"
                    );
                    return QUERY_REPLACED_SENTINEL.to_string();
                }
            }
        }
    }
    resolved
}
