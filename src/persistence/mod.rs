//! Write scopes, the in-memory store and query functions

pub mod function;
pub mod memory;
pub mod scope;

pub use function::{
    EncryptFunctionStrategy, FunctionError, FunctionStrategy, QUERY_REPLACED_SENTINEL,
    QueryFunction, resolve_query_functions,
};
pub use memory::{InMemoryStore, MemoryScope};
pub use scope::{IdKind, RecordSpec, ScopeFactory, WriteError, WriteScope};
