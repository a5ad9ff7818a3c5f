//! Query function resolution, alone and through a repository

use crudframe::persistence::{
    EncryptFunctionStrategy, FunctionStrategy, QUERY_REPLACED_SENTINEL, resolve_query_functions,
};
use crudframe::prelude::*;

// =============================================================================
// Test Entities
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credential {
    id: Option<i64>,
    login: String,
    password: Option<String>,
}

impl Describe for Credential {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Credential>()
            .attribute(AttributeDescriptor::new("id", TypeRef::number::<i64>()).identifier())
            .attribute(AttributeDescriptor::new("login", TypeRef::String))
            .attribute(
                AttributeDescriptor::new("password", TypeRef::String)
                    .secret()
                    .encrypt(Algorithm::Md5),
            )
    }
}

impl_entity!(Credential, "credential", "credentials", [id, login, password]);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Memo {
    id: Option<i64>,
    body: String,
}

impl Describe for Memo {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::of::<Memo>()
            .attribute(AttributeDescriptor::new("id", TypeRef::number::<i64>()).identifier())
            .attribute(AttributeDescriptor::new("body", TypeRef::String))
    }
}

impl_entity!(Memo, "memo", "memos", [id, body]);

fn md5(value: &str) -> String {
    Encrypter::new(Algorithm::Md5).encrypt(value)
}

fn credential(login: &str, password: &str) -> Credential {
    Credential {
        id: None,
        login: login.to_string(),
        password: Some(password.to_string()),
    }
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_encrypt_call_is_replaced_by_digest() {
    let resolved = resolve_query_functions("password = '#encrypt(secret)'", &Credential::describe());
    assert_eq!(resolved, "password = '5ebe2294ecd0e0f08eab7690d2a6ee69'");
}

#[test]
fn test_entity_without_marker_keeps_query() {
    let query = "body = '#encrypt(secret)'";
    assert_eq!(resolve_query_functions(query, &Memo::describe()), query);
}

#[test]
fn test_query_without_function_is_unchanged() {
    let query = "login = 'ada'";
    assert_eq!(resolve_query_functions(query, &Credential::describe()), query);
    assert_eq!(resolve_query_functions("", &Credential::describe()), "");
}

#[test]
fn test_every_call_is_resolved() {
    let resolved = resolve_query_functions(
        "password = '#encrypt(a)' and login = '#encrypt(b)'",
        &Credential::describe(),
    );
    assert_eq!(
        resolved,
        format!("password = '{}' and login = '{}'", md5("a"), md5("b"))
    );
}

#[test]
fn test_nested_parentheses_stay_in_the_argument() {
    let resolved = resolve_query_functions("password = '#encrypt(p(a)ss)'", &Credential::describe());
    assert_eq!(resolved, format!("password = '{}'", md5("p(a)ss")));
}

#[test]
fn test_single_character_argument_at_end() {
    let resolved = resolve_query_functions("#encrypt(x)", &Credential::describe());
    assert_eq!(resolved, md5("x"));
}

#[test]
fn test_unresolvable_call_fails_closed() {
    let descriptor = Credential::describe();
    assert_eq!(
        resolve_query_functions("password = '#encrypt(secret'", &descriptor),
        QUERY_REPLACED_SENTINEL
    );
    assert_eq!(
        resolve_query_functions("password = '#encrypt secret' and x = 'yy'", &descriptor),
        QUERY_REPLACED_SENTINEL
    );
}

#[test]
fn test_strategy_validity() {
    let strategy = EncryptFunctionStrategy;
    let descriptor = Credential::describe();

    assert!(strategy.is_valid("#encrypt(x)", 0, &descriptor));
    assert!(!strategy.is_valid("#encrypt()", 0, &descriptor));
    assert!(!strategy.is_valid("   ", 0, &descriptor));
    assert!(!strategy.is_valid("#encrypt(x)", 0, &Memo::describe()));
}

// =============================================================================
// Through a repository
// =============================================================================

#[tokio::test]
async fn test_query_matches_digested_password() {
    let repository = GenericRepository::<Credential>::new(Arc::new(InMemoryStore::new()));
    repository.save_or_update(&mut credential("ada", "secret")).await.unwrap();
    repository.save_or_update(&mut credential("bob", "hunter2")).await.unwrap();

    let found = repository
        .query_single_result("password = '#encrypt(secret)'")
        .await
        .unwrap();
    assert_eq!(found.login, "ada");
    assert_eq!(found.password.as_deref(), Some("5ebe2294ecd0e0f08eab7690d2a6ee69"));

    let deleted = repository
        .query_delete("login = 'bob' and password = '#encrypt(hunter2)'")
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn test_failed_resolution_never_runs_the_query() {
    let store = InMemoryStore::new();
    let repository = GenericRepository::<Credential>::new(Arc::new(store.clone()));
    repository.save_or_update(&mut credential("ada", "secret")).await.unwrap();

    let err = repository
        .query("password = '#encrypt(secret'", 0, 0)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ENTITY_OPERATION_FAILED");
    assert!(!err.to_string().contains("secret'"));

    assert_eq!(store.open_scopes(), 0);
    assert_eq!(store.count(Credential::describe().name()), 1);
}
