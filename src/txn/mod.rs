//! Transactions
//!
//! A [`Transaction`] stages `(dn, property, value)` mutations and applies them
//! atomically on [`Transaction::commit`]. Either every staged mutation is
//! applied or none is, and each affected object yields exactly one
//! property-change event carrying all of its changed properties.

mod commit;

#[cfg(test)]
mod transaction_test;

pub(crate) use commit::*;

use std::fmt;
use std::sync::Arc;

use crate::store::StoreCore;
use crate::Dn;
use crate::Result;
use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMutation {
    pub dn: Dn,
    pub name: String,
    pub value: String,
}

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Monotonic commit sequence number
    pub commit_id: u64,
    /// Objects whose values changed, in first-touched order
    pub changed: Vec<Dn>,
}

/// Batch of staged property mutations
pub struct Transaction {
    core: Arc<StoreCore>,
    staged: Vec<StagedMutation>,
}

impl fmt::Debug for Transaction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Transaction").field("staged", &self.staged).finish_non_exhaustive()
    }
}

impl Transaction {
    pub(crate) fn new(core: Arc<StoreCore>) -> Self {
        Self {
            core,
            staged: Vec::new(),
        }
    }

    /// Stage a property write.
    ///
    /// Only the Dn syntax, the property name and the transaction size are
    /// checked here; existence and schema checks happen on commit.
    pub fn set_property(
        &mut self,
        dn: &str,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let dn = Dn::parse(dn)?;
        self.stage(dn, name, value)
    }

    pub(crate) fn stage(
        &mut self,
        dn: Dn,
        name: &str,
        value: &str,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidProperty {
                dn: dn.to_string(),
                property: name.to_string(),
            }
            .into());
        }
        let limit = self.core.config.max_transaction_size;
        if self.staged.len() >= limit {
            return Err(StoreError::TransactionTooLarge { limit }.into());
        }
        self.staged.push(StagedMutation {
            dn,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    pub fn staged(&self) -> &[StagedMutation] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Drop every staged mutation
    pub fn clear(&mut self) {
        self.staged.clear();
    }

    /// Validate and apply every staged mutation.
    ///
    /// The staged list is consumed whatever the outcome. Returns once the
    /// resulting events are queued; handlers run later on the dispatcher.
    pub fn commit(&mut self) -> Result<CommitReceipt> {
        let staged = std::mem::take(&mut self.staged);
        self.core.commit(staged)
    }
}
