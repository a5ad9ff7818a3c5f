//! In-memory write scopes for testing and development
//!
//! Records live in per-type tables ordered by insertion. A transaction works
//! on a snapshot of the tables and records its writes; commit replays the
//! writes onto the live tables after re-checking primary keys and unique
//! constraints.

use crate::core::field::FieldValue;
use crate::persistence::function::QUERY_REPLACED_SENTINEL;
use crate::persistence::scope::{IdKind, RecordSpec, ScopeFactory, WriteError, WriteScope};
use crate::schema::descriptor::Describe;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

type Table = IndexMap<String, Value>;
type Tables = HashMap<String, Table>;

#[derive(Default)]
struct StoreState {
    tables: Tables,
    sequences: HashMap<String, i64>,
}

#[derive(Default)]
struct ScopeCounters {
    acquired: AtomicUsize,
    closed: AtomicUsize,
}

/// In-memory store handing out transactional [`WriteScope`]s
///
/// Cloning is cheap; clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    unique: Arc<HashMap<String, Vec<String>>>,
    counters: Arc<ScopeCounters>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to be unique among records of `T`
    pub fn unique<T: Describe>(self, field: &str) -> Self {
        self.unique_for(T::describe().name(), field)
    }

    /// Require `field` to be unique among records of `entity_type`
    pub fn unique_for(mut self, entity_type: &str, field: &str) -> Self {
        Arc::make_mut(&mut self.unique)
            .entry(entity_type.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    /// Number of committed records of `entity_type`
    pub fn count(&self, entity_type: &str) -> usize {
        self.state
            .read()
            .map(|state| state.tables.get(entity_type).map_or(0, IndexMap::len))
            .unwrap_or(0)
    }

    /// Scopes acquired and not yet closed
    pub fn open_scopes(&self) -> usize {
        self.counters
            .acquired
            .load(Ordering::SeqCst)
            .saturating_sub(self.counters.closed.load(Ordering::SeqCst))
    }

    fn next_id(&self, spec: &RecordSpec) -> Result<Value, WriteError> {
        match spec.id_kind {
            IdKind::Integer => {
                let mut state = self
                    .state
                    .write()
                    .map_err(|e| WriteError::failure(format!("Failed to acquire write lock: {}", e)))?;
                let sequence = state.sequences.entry(spec.entity_type.clone()).or_insert(0);
                *sequence += 1;
                Ok(Value::from(*sequence))
            }
            IdKind::Uuid | IdKind::Text => Ok(Value::String(Uuid::new_v4().to_string())),
        }
    }

    /// Move the integer sequence past an identifier supplied by the caller
    fn observe_id(&self, spec: &RecordSpec, id: &FieldValue) -> Result<(), WriteError> {
        let (IdKind::Integer, Some(id)) = (spec.id_kind, id.as_integer()) else {
            return Ok(());
        };
        let mut state = self
            .state
            .write()
            .map_err(|e| WriteError::failure(format!("Failed to acquire write lock: {}", e)))?;
        let sequence = state.sequences.entry(spec.entity_type.clone()).or_insert(0);
        *sequence = (*sequence).max(id);
        Ok(())
    }

    fn snapshot(&self) -> Result<Tables, WriteError> {
        let state = self
            .state
            .read()
            .map_err(|e| WriteError::failure(format!("Failed to acquire read lock: {}", e)))?;
        Ok(state.tables.clone())
    }

    fn apply(&self, ops: Vec<Op>) -> Result<(), WriteError> {
        let mut state = self
            .state
            .write()
            .map_err(|e| WriteError::failure(format!("Failed to acquire write lock: {}", e)))?;

        let mut next = state.tables.clone();
        for op in ops {
            match op {
                Op::Put {
                    entity_type,
                    key,
                    record,
                    insert,
                } => {
                    let table = next.entry(entity_type.clone()).or_default();
                    if insert && table.contains_key(&key) {
                        return Err(duplicate_key(&entity_type, &key));
                    }
                    check_unique(&self.unique, &entity_type, table, &key, &record)?;
                    table.insert(key, record);
                }
                Op::Delete { entity_type, key } => {
                    if let Some(table) = next.get_mut(&entity_type) {
                        table.shift_remove(&key);
                    }
                }
            }
        }
        state.tables = next;
        Ok(())
    }
}

#[async_trait]
impl ScopeFactory for InMemoryStore {
    async fn acquire(&self) -> Result<Box<dyn WriteScope>, WriteError> {
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryScope {
            store: self.clone(),
            transaction: None,
            closed: false,
        }))
    }
}

enum Op {
    Put {
        entity_type: String,
        key: String,
        record: Value,
        /// Persisted rather than merged: the key must still be free at commit
        insert: bool,
    },
    Delete {
        entity_type: String,
        key: String,
    },
}

struct Transaction {
    tables: Tables,
    ops: Vec<Op>,
}

impl Transaction {
    fn put(&mut self, entity_type: &str, key: String, record: Value, insert: bool) {
        self.tables
            .entry(entity_type.to_string())
            .or_default()
            .insert(key.clone(), record.clone());
        self.ops.push(Op::Put {
            entity_type: entity_type.to_string(),
            key,
            record,
            insert,
        });
    }

    fn delete(&mut self, entity_type: &str, key: String) -> bool {
        let removed = self
            .tables
            .get_mut(entity_type)
            .and_then(|table| table.shift_remove(&key))
            .is_some();
        if removed {
            self.ops.push(Op::Delete {
                entity_type: entity_type.to_string(),
                key,
            });
        }
        removed
    }
}

/// One scope handed out by [`InMemoryStore`]
pub struct MemoryScope {
    store: InMemoryStore,
    transaction: Option<Transaction>,
    closed: bool,
}

impl MemoryScope {
    fn ensure_open(&self) -> Result<(), WriteError> {
        if self.closed {
            return Err(WriteError::failure("write scope is closed"));
        }
        Ok(())
    }

    fn active(&mut self) -> Result<&mut Transaction, WriteError> {
        self.ensure_open()?;
        self.transaction
            .as_mut()
            .ok_or_else(|| WriteError::failure("no active transaction"))
    }

    /// Rows visible to this scope: the transaction snapshot when one is open
    fn rows(&self, entity_type: &str) -> Result<Vec<Value>, WriteError> {
        self.ensure_open()?;
        match &self.transaction {
            Some(tx) => Ok(tx
                .tables
                .get(entity_type)
                .map(|table| table.values().cloned().collect())
                .unwrap_or_default()),
            None => Ok(self
                .store
                .snapshot()?
                .remove(entity_type)
                .map(|table| table.into_values().collect())
                .unwrap_or_default()),
        }
    }
}

#[async_trait]
impl WriteScope for MemoryScope {
    async fn begin(&mut self) -> Result<(), WriteError> {
        self.ensure_open()?;
        if self.transaction.is_some() {
            return Err(WriteError::failure("transaction already active"));
        }
        self.transaction = Some(Transaction {
            tables: self.store.snapshot()?,
            ops: Vec::new(),
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), WriteError> {
        self.ensure_open()?;
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| WriteError::failure("no active transaction"))?;
        self.store.apply(tx.ops)
    }

    async fn rollback(&mut self) -> Result<(), WriteError> {
        self.ensure_open()?;
        self.transaction = None;
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.transaction.take().is_some() {
            tracing::debug!("Discarding uncommitted in-memory transaction on close");
        }
        self.closed = true;
        self.store.counters.closed.fetch_add(1, Ordering::SeqCst);
    }

    async fn find(
        &mut self,
        spec: &RecordSpec,
        id: &FieldValue,
    ) -> Result<Option<Value>, WriteError> {
        if id.is_null() {
            return Ok(None);
        }
        let key = id.to_string();
        Ok(self
            .rows(&spec.entity_type)?
            .into_iter()
            .find(|record| spec.id_of(record).to_string() == key))
    }

    async fn merge(&mut self, spec: &RecordSpec, mut record: Value) -> Result<Value, WriteError> {
        let id = spec.id_of(&record);
        if id.is_null() {
            return Err(WriteError::failure(format!(
                "cannot merge transient {}: identifier is not set",
                spec.entity_type
            )));
        }
        let key = id.to_string();
        self.active()?;
        self.store.observe_id(spec, &id)?;
        let unique = self.store.unique.clone();
        let tx = self.active()?;
        let table = tx.tables.entry(spec.entity_type.clone()).or_default();

        if let Some(field) = &spec.version_field {
            let version = match table.get(&key).and_then(|existing| existing.get(field)) {
                Some(Value::Number(n)) => n.as_i64().map_or(0, |v| v + 1),
                _ => record.get(field).and_then(Value::as_i64).unwrap_or(0),
            };
            set(&mut record, field, Value::from(version));
        }

        check_unique(&unique, &spec.entity_type, table, &key, &record)?;
        tx.put(&spec.entity_type, key, record.clone(), false);
        Ok(record)
    }

    async fn persist(&mut self, spec: &RecordSpec, mut record: Value) -> Result<Value, WriteError> {
        self.active()?;
        let id = match spec.id_of(&record) {
            FieldValue::Null => {
                let generated = self.store.next_id(spec)?;
                if let Some(field) = &spec.id_field {
                    set(&mut record, field, generated.clone());
                }
                FieldValue::from_json(&generated)
            }
            assigned => {
                self.store.observe_id(spec, &assigned)?;
                assigned
            }
        };
        let key = id.to_string();

        if let Some(field) = &spec.version_field {
            if record.get(field).is_none_or(Value::is_null) {
                set(&mut record, field, Value::from(0));
            }
        }

        let unique = self.store.unique.clone();
        let tx = self.active()?;
        let table = tx.tables.entry(spec.entity_type.clone()).or_default();
        if spec.id_field.is_some() && table.contains_key(&key) {
            return Err(duplicate_key(&spec.entity_type, &key));
        }
        check_unique(&unique, &spec.entity_type, table, &key, &record)?;
        tx.put(&spec.entity_type, key, record.clone(), true);
        Ok(record)
    }

    async fn remove(&mut self, spec: &RecordSpec, id: &FieldValue) -> Result<bool, WriteError> {
        let key = id.to_string();
        let tx = self.active()?;
        Ok(tx.delete(&spec.entity_type, key))
    }

    async fn query(
        &mut self,
        spec: &RecordSpec,
        query: &str,
        first: usize,
        max: usize,
    ) -> Result<Vec<Value>, WriteError> {
        let conditions = parse_query(query)?;
        let limit = if max == 0 { usize::MAX } else { max };
        Ok(self
            .rows(&spec.entity_type)?
            .into_iter()
            .filter(|record| matches_all(record, &conditions))
            .skip(first)
            .take(limit)
            .collect())
    }

    async fn execute_delete(&mut self, spec: &RecordSpec, query: &str) -> Result<u64, WriteError> {
        let conditions = parse_query(query)?;
        let keys: Vec<String> = self
            .rows(&spec.entity_type)?
            .iter()
            .filter(|record| matches_all(record, &conditions))
            .map(|record| spec.id_of(record).to_string())
            .collect();

        let tx = self.active()?;
        let mut removed = 0;
        for key in keys {
            if tx.delete(&spec.entity_type, key) {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn set(record: &mut Value, field: &str, value: Value) {
    if let Value::Object(map) = record {
        map.insert(field.to_string(), value);
    }
}

fn duplicate_key(entity_type: &str, key: &str) -> WriteError {
    WriteError::ConstraintViolation {
        constraint: "primary key".to_string(),
        message: format!("{} with id '{}' already exists", entity_type, key),
    }
}

fn check_unique(
    unique: &HashMap<String, Vec<String>>,
    entity_type: &str,
    table: &Table,
    key: &str,
    record: &Value,
) -> Result<(), WriteError> {
    let Some(fields) = unique.get(entity_type) else {
        return Ok(());
    };
    for field in fields {
        let Some(value) = record.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = table
            .iter()
            .any(|(other, existing)| other != key && existing.get(field) == Some(value));
        if taken {
            return Err(WriteError::ConstraintViolation {
                constraint: field.clone(),
                message: format!("duplicate value {} for {}.{}", value, entity_type, field),
            });
        }
    }
    Ok(())
}

/// `field = value` condition of a query
#[derive(Debug, Clone, PartialEq)]
struct Condition {
    field: String,
    value: Value,
}

/// Parse `field = 'value' [and field = value ...]`; `*` or blank selects all
fn parse_query(query: &str) -> Result<Vec<Condition>, WriteError> {
    let text = query.trim();
    if text.is_empty() || text == "*" {
        return Ok(Vec::new());
    }
    if text == QUERY_REPLACED_SENTINEL {
        return Err(WriteError::failure(
            "query refused: a query function failed to resolve",
        ));
    }

    let malformed = |reason: &str| WriteError::InvalidQuery {
        query: query.to_string(),
        message: reason.to_string(),
    };
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut conditions = Vec::new();

    loop {
        skip_whitespace(&chars, &mut pos);
        let start = pos;
        while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
            pos += 1;
        }
        if start == pos {
            return Err(malformed("expected a field name"));
        }
        let field: String = chars[start..pos].iter().collect();

        skip_whitespace(&chars, &mut pos);
        if chars.get(pos) != Some(&'=') {
            return Err(malformed("expected '='"));
        }
        pos += 1;
        skip_whitespace(&chars, &mut pos);

        let value = if chars.get(pos) == Some(&'\'') {
            pos += 1;
            let start = pos;
            while pos < chars.len() && chars[pos] != '\'' {
                pos += 1;
            }
            if pos == chars.len() {
                return Err(malformed("unterminated string literal"));
            }
            let literal: String = chars[start..pos].iter().collect();
            pos += 1;
            Value::String(literal)
        } else {
            let start = pos;
            while pos < chars.len() && !chars[pos].is_whitespace() {
                pos += 1;
            }
            if start == pos {
                return Err(malformed("expected a value"));
            }
            bare_value(&chars[start..pos].iter().collect::<String>())
        };
        conditions.push(Condition { field, value });

        skip_whitespace(&chars, &mut pos);
        if pos == chars.len() {
            return Ok(conditions);
        }
        let keyword: String = chars[pos..chars.len().min(pos + 3)].iter().collect();
        let followed_by_space = chars.get(pos + 3).is_some_and(|c| c.is_whitespace());
        if !keyword.eq_ignore_ascii_case("and") || !followed_by_space {
            return Err(malformed("expected 'and'"));
        }
        pos += 3;
    }
}

fn skip_whitespace(chars: &[char], pos: &mut usize) {
    while *pos < chars.len() && chars[*pos].is_whitespace() {
        *pos += 1;
    }
}

fn bare_value(token: &str) -> Value {
    if let Ok(i) = token.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = token.parse::<f64>() {
        return Value::from(f);
    }
    match token.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => Value::String(token.to_string()),
    }
}

fn matches_all(record: &Value, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| {
        let stored = record.get(&condition.field).unwrap_or(&Value::Null);
        match (stored, &condition.value) {
            (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::String(b)) => &a.to_string() == b,
            (a, b) => a == b,
        }
    })
}
