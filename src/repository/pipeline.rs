//! Field resolution around a merge-or-persist write
//!
//! A save runs three steps against one write scope:
//!
//! 1. [`pre_resolve`] fills blank `random` attributes and digests `encrypt`
//!    attributes on the caller's entity.
//! 2. The entity is merged; when the merge fails for any reason other than a
//!    constraint violation it is persisted instead.
//! 3. [`post_resolve`] reconciles the caller's entity with the stored
//!    counterpart (version, identifier, retained random values).
//!
//! Field transforms never fail the save. Each attribute reports a
//! [`FieldOutcome`]; an access failure stops the phase and is reported as
//! [`SkipReason::Aborted`], leaving earlier mutations in place.

use crate::core::entity::Entity;
use crate::core::field::FieldValue;
use crate::persistence::scope::{RecordSpec, WriteError, WriteScope};
use crate::security::algorithm::{Encrypter, is_digest};
use std::collections::HashMap;

/// Values produced before the write and needed after it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostValues {
    retained: HashMap<String, String>,
}

impl PostValues {
    /// Plain random value generated for `field`, when retained
    pub fn retained(&self, field: &str) -> Option<&str> {
        self.retained.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }

    fn retain(&mut self, field: &str, value: String) {
        self.retained.insert(field.to_string(), value);
    }
}

/// Transform applied to one attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAction {
    GenerateRandom,
    Encrypt,
    CopyVersion,
    CopyIdentifier,
    RestoreRandom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The marker only applies to textual attributes
    NotText,
    /// A random attribute already had a value
    AlreadySet,
    /// The value already looks like a digest
    AlreadyDigest,
    /// Nothing to encrypt
    NoValue,
    /// No random value was retained for the attribute
    NothingRetained,
    /// Reading or writing the attribute failed; the phase stopped here
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Applied {
        field: String,
        action: FieldAction,
    },
    Skipped {
        field: String,
        action: FieldAction,
        reason: SkipReason,
    },
}

impl FieldOutcome {
    fn applied(field: &str, action: FieldAction) -> Self {
        FieldOutcome::Applied {
            field: field.to_string(),
            action,
        }
    }

    fn skipped(field: &str, action: FieldAction, reason: SkipReason) -> Self {
        FieldOutcome::Skipped {
            field: field.to_string(),
            action,
            reason,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldOutcome::Applied { field, .. } | FieldOutcome::Skipped { field, .. } => field,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, FieldOutcome::Applied { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            FieldOutcome::Skipped {
                reason: SkipReason::Aborted(_),
                ..
            }
        )
    }
}

/// Result of the pre-save phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreResolution {
    pub post_values: PostValues,
    pub outcomes: Vec<FieldOutcome>,
}

/// Which write reached the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    Merged,
    Persisted,
}

/// Everything a save produced
#[derive(Debug, Clone)]
pub struct SaveReport<T> {
    /// The stored counterpart returned by the write
    pub generated: T,
    pub path: WritePath,
    pub pre: PreResolution,
    pub post: Vec<FieldOutcome>,
}

/// Stop the phase on the first access failure
struct Abort(FieldOutcome);

fn read<T: Entity>(entity: &T, field: &str, action: FieldAction) -> Result<FieldValue, Abort> {
    entity.field_value(field).map_err(|e| {
        Abort(FieldOutcome::skipped(
            field,
            action,
            SkipReason::Aborted(e.to_string()),
        ))
    })
}

fn write<T: Entity>(
    entity: &mut T,
    field: &str,
    action: FieldAction,
    value: FieldValue,
) -> Result<(), Abort> {
    entity.set_field_value(field, value).map_err(|e| {
        Abort(FieldOutcome::skipped(
            field,
            action,
            SkipReason::Aborted(e.to_string()),
        ))
    })
}

/// Pre-save phase: random generation then encryption, per attribute
pub fn pre_resolve<T: Entity>(entity: &mut T) -> PreResolution {
    let mut resolution = PreResolution::default();
    if let Err(Abort(outcome)) = pre_resolve_into(entity, &mut resolution) {
        tracing::warn!(
            entity = T::entity_name(),
            field = outcome.field(),
            "Couldn't pre resolve the entity: {:?}",
            outcome
        );
        resolution.outcomes.push(outcome);
    }
    resolution
}

fn pre_resolve_into<T: Entity>(entity: &mut T, resolution: &mut PreResolution) -> Result<(), Abort> {
    for attribute in T::describe().all_attributes() {
        let field = attribute.name;

        if let Some(spec) = attribute.random {
            let action = FieldAction::GenerateRandom;
            if !attribute.ty.is_string() {
                resolution
                    .outcomes
                    .push(FieldOutcome::skipped(field, action, SkipReason::NotText));
            } else if read(entity, field, action)?.is_blank() {
                let value = spec.generate();
                write(entity, field, action, FieldValue::String(value.clone()))?;
                if spec.retain_on_insert {
                    resolution.post_values.retain(field, value);
                }
                tracing::debug!(entity = T::entity_name(), field, "Generated random value");
                resolution.outcomes.push(FieldOutcome::applied(field, action));
            } else {
                resolution
                    .outcomes
                    .push(FieldOutcome::skipped(field, action, SkipReason::AlreadySet));
            }
        }

        if let Some(algorithm) = attribute.encrypt {
            let action = FieldAction::Encrypt;
            if !attribute.ty.is_string() {
                resolution
                    .outcomes
                    .push(FieldOutcome::skipped(field, action, SkipReason::NotText));
                continue;
            }
            match read(entity, field, action)? {
                FieldValue::String(value) if is_digest(&value) => {
                    resolution
                        .outcomes
                        .push(FieldOutcome::skipped(field, action, SkipReason::AlreadyDigest));
                }
                FieldValue::String(value) => {
                    let encrypted = Encrypter::new(algorithm).encrypt(&value);
                    write(entity, field, action, FieldValue::String(encrypted))?;
                    resolution.outcomes.push(FieldOutcome::applied(field, action));
                }
                _ => {
                    resolution
                        .outcomes
                        .push(FieldOutcome::skipped(field, action, SkipReason::NoValue));
                }
            }
        }
    }
    Ok(())
}

/// Post-save phase: reconcile `entity` with the stored `generated` counterpart
pub fn post_resolve<T: Entity>(
    entity: &mut T,
    generated: &mut T,
    post_values: &PostValues,
) -> Vec<FieldOutcome> {
    let mut outcomes = Vec::new();
    if let Err(Abort(outcome)) = post_resolve_into(entity, generated, post_values, &mut outcomes) {
        tracing::warn!(
            entity = T::entity_name(),
            field = outcome.field(),
            "Couldn't post resolve the entity: {:?}",
            outcome
        );
        outcomes.push(outcome);
    }
    outcomes
}

fn post_resolve_into<T: Entity>(
    entity: &mut T,
    generated: &mut T,
    post_values: &PostValues,
    outcomes: &mut Vec<FieldOutcome>,
) -> Result<(), Abort> {
    for attribute in T::describe().all_attributes() {
        let field = attribute.name;

        if attribute.version {
            let action = FieldAction::CopyVersion;
            let version = read(generated, field, action)?;
            write(entity, field, action, version)?;
            outcomes.push(FieldOutcome::applied(field, action));
        }

        if attribute.identifier {
            let action = FieldAction::CopyIdentifier;
            let id = read(generated, field, action)?;
            if id.is_null() {
                let assigned = read(entity, field, action)?;
                write(generated, field, action, assigned)?;
            } else {
                write(entity, field, action, id)?;
            }
            outcomes.push(FieldOutcome::applied(field, action));
        }

        if attribute.random.is_some_and(|spec| spec.retain_on_insert) {
            let action = FieldAction::RestoreRandom;
            match post_values.retained(field).filter(|v| !v.trim().is_empty()) {
                Some(value) => {
                    write(entity, field, action, FieldValue::String(value.to_string()))?;
                    outcomes.push(FieldOutcome::applied(field, action));
                }
                None => outcomes.push(FieldOutcome::skipped(
                    field,
                    action,
                    SkipReason::NothingRetained,
                )),
            }
        }
    }
    Ok(())
}

/// Pre-resolve, write and post-resolve `entity` inside an open scope
///
/// A constraint violation from the merge is returned as-is. Any other merge
/// failure falls back to persist, whose failure is returned.
pub async fn merge_or_persist<T: Entity>(
    scope: &mut dyn WriteScope,
    spec: &RecordSpec,
    entity: &mut T,
) -> Result<SaveReport<T>, WriteError> {
    let pre = pre_resolve(entity);
    let record = serde_json::to_value(&*entity).map_err(|e| {
        WriteError::failure(format!("Failed to serialize {}: {}", T::entity_name(), e))
    })?;

    let (stored, path) = match scope.merge(spec, record.clone()).await {
        Ok(stored) => (stored, WritePath::Merged),
        Err(e) if e.is_constraint_violation() => return Err(e),
        Err(e) => {
            tracing::debug!(
                entity = T::entity_name(),
                reason = %e,
                "Merge failed, persisting as a new entity"
            );
            (scope.persist(spec, record).await?, WritePath::Persisted)
        }
    };

    let mut generated: T = serde_json::from_value(stored).map_err(|e| {
        WriteError::failure(format!("Failed to deserialize {}: {}", T::entity_name(), e))
    })?;
    let post = post_resolve(entity, &mut generated, &pre.post_values);

    Ok(SaveReport {
        generated,
        path,
        pre,
        post,
    })
}
