//! Validation and application of staged mutations
//!
//! Runs under the store lock against the current object map. Every mutation
//! is validated before anything is written, so a failure leaves the map
//! untouched.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::StagedMutation;
use crate::schema::PropertyCheck;
use crate::AbortReason;
use crate::Dn;
use crate::ManagedObject;
use crate::ObjectMap;
use crate::Schema;
use crate::StoreError;

/// Net effect of a commit on one object
#[derive(Debug, Clone)]
pub(crate) struct AppliedChange {
    pub(crate) object: Arc<ManagedObject>,
    pub(crate) changed: BTreeSet<String>,
}

fn abort(
    mutation: &StagedMutation,
    reason: AbortReason,
) -> StoreError {
    StoreError::TransactionAborted {
        dn: mutation.dn.to_string(),
        property: mutation.name.clone(),
        reason,
    }
}

/// Validate in order: (1) object exists, (2) property is known for the
/// object's class, (3) value satisfies the property type.
pub(crate) fn validate(
    objects: &ObjectMap,
    schema: &Schema,
    mutations: &[StagedMutation],
) -> std::result::Result<(), StoreError> {
    for mutation in mutations {
        let obj = objects
            .get(&mutation.dn)
            .ok_or_else(|| abort(mutation, AbortReason::NotFound))?;

        match schema.check_write(obj.class(), &mutation.name, &mutation.value) {
            PropertyCheck::Accepted => {}
            PropertyCheck::UnknownProperty => {
                return Err(abort(mutation, AbortReason::InvalidProperty));
            }
            PropertyCheck::InvalidValue(detail) => {
                return Err(abort(mutation, AbortReason::InvalidValue(detail)));
            }
        }
    }
    Ok(())
}

/// Apply validated mutations and return the new map together with one
/// change record per object whose values actually changed, in the order the
/// objects were first touched.
pub(crate) fn apply(
    objects: &ObjectMap,
    mutations: &[StagedMutation],
) -> (ObjectMap, Vec<AppliedChange>) {
    let mut order: Vec<Dn> = Vec::new();
    let mut working: HashMap<Dn, ManagedObject> = HashMap::new();

    for mutation in mutations {
        if !working.contains_key(&mutation.dn) {
            // Validated beforehand
            let Some(original) = objects.get(&mutation.dn) else {
                continue;
            };
            order.push(mutation.dn.clone());
            working.insert(mutation.dn.clone(), original.as_ref().clone());
        }
        if let Some(obj) = working.get_mut(&mutation.dn) {
            obj.set_property(&mutation.name, &mutation.value);
        }
    }

    let mut next = objects.clone();
    let mut changes = Vec::new();

    for dn in order {
        let Some(updated) = working.remove(&dn) else {
            continue;
        };
        let Some(original) = objects.get(&dn) else {
            continue;
        };
        let changed: BTreeSet<String> = updated
            .properties()
            .iter()
            .filter(|(name, value)| original.property(name) != Some(value.as_str()))
            .map(|(name, _)| name.clone())
            .collect();

        if changed.is_empty() {
            debug!(dn = %dn, "Commit left object unchanged");
            continue;
        }

        let updated = Arc::new(updated);
        next.insert(dn, updated.clone());
        changes.push(AppliedChange {
            object: updated,
            changed,
        });
    }

    (next, changes)
}
