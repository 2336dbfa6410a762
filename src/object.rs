//! Object handle
//!
//! [`DmeObject`] is what callers and handlers hold: a snapshot of one managed
//! object, restartable property iteration, a per-object transaction and, during
//! event delivery, the event that triggered the callback.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::cursor::PropertyCursor;
use crate::store::render;
use crate::store::ObjectTree;
use crate::store::StoreCore;
use crate::txn::CommitReceipt;
use crate::txn::Transaction;
use crate::Dn;
use crate::DmeEvent;
use crate::EventKind;
use crate::ManagedObject;
use crate::Result;
use crate::StoreError;

pub struct DmeObject {
    core: Arc<StoreCore>,
    snapshot: Arc<ManagedObject>,
    event: Option<DmeEvent>,
    cursor: PropertyCursor,
    changed_cursor: PropertyCursor,
    pending: Transaction,
}

impl fmt::Debug for DmeObject {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DmeObject")
            .field("dn", self.snapshot.dn())
            .field("properties", self.snapshot.properties())
            .field("event", &self.event.as_ref().map(|e| e.kind()))
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl PartialEq for DmeObject {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.snapshot.dn() == other.snapshot.dn()
            && self.snapshot.properties() == other.snapshot.properties()
    }
}

impl DmeObject {
    pub(crate) fn new(
        core: Arc<StoreCore>,
        snapshot: Arc<ManagedObject>,
    ) -> Self {
        let pending = Transaction::new(core.clone());
        Self {
            core,
            snapshot,
            event: None,
            cursor: PropertyCursor::new(),
            changed_cursor: PropertyCursor::new(),
            pending,
        }
    }

    pub(crate) fn from_event(
        core: Arc<StoreCore>,
        event: DmeEvent,
    ) -> Self {
        let mut obj = Self::new(core, event.object().clone());
        obj.event = Some(event);
        obj
    }

    pub fn dn(&self) -> &Dn {
        self.snapshot.dn()
    }

    pub fn class(&self) -> Option<&str> {
        self.snapshot.class()
    }

    /// Object state this handle currently reflects
    pub fn snapshot(&self) -> &ManagedObject {
        &self.snapshot
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        self.snapshot.properties()
    }

    pub fn get_property(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.snapshot.property(name)
    }

    /// Stage a write on this object; applied by [`DmeObject::commit`]
    pub fn set_property(
        &mut self,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let dn = self.snapshot.dn().clone();
        self.pending.stage(dn, name, value)
    }

    pub fn pending(&self) -> &Transaction {
        &self.pending
    }

    /// Commit the writes staged on this handle and reload the snapshot
    pub fn commit(&mut self) -> Result<CommitReceipt> {
        let receipt = self.pending.commit()?;
        if let Ok(Some(current)) = self.current() {
            self.snapshot = current;
        }
        Ok(receipt)
    }

    /// Reload the snapshot from the store
    pub fn refresh(&mut self) -> Result<()> {
        match self.current()? {
            Some(current) => {
                self.snapshot = current;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// `{"<dn>": {prop: value}}` of the snapshot
    pub fn data_json(&self) -> Result<String> {
        let mut tree = ObjectTree::new();
        tree.insert(self.dn().to_string(), self.properties().clone());
        render(&tree)
    }

    /// Next property in ascending name order.
    ///
    /// `from_first` reloads the object and restarts at the first property.
    /// Fails with `NotFound` once the object has been deleted or re-created.
    pub fn iterate_properties(
        &mut self,
        from_first: bool,
    ) -> Result<Option<(String, String)>> {
        let current = self.current()?;
        if from_first {
            if let Some(current) = current {
                self.snapshot = current;
            }
        }
        Ok(self
            .cursor
            .next_entry(from_first, self.snapshot.properties())
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Event being delivered, `None` outside a handler callback
    pub fn event(&self) -> Option<EventKind> {
        self.event.as_ref().map(|e| e.kind())
    }

    /// Whether the event being delivered is part of a watch download
    pub fn is_download(&self) -> bool {
        self.event.as_ref().is_some_and(|e| e.is_download())
    }

    pub fn is_property_changed(
        &self,
        name: &str,
    ) -> bool {
        self.event.as_ref().is_some_and(|e| e.changed().contains(name))
    }

    /// Next property name in the changed set of the event being delivered
    pub fn iterate_changed_properties(
        &mut self,
        from_first: bool,
    ) -> Option<String> {
        let event = self.event.as_ref()?;
        self.changed_cursor.next_name(from_first, event.changed()).cloned()
    }

    /// Live object for this handle's instance.
    ///
    /// `Ok(None)` on the handle of a deletion event, which keeps the final
    /// state; `NotFound` when the instance is gone from the store.
    fn current(&self) -> std::result::Result<Option<Arc<ManagedObject>>, StoreError> {
        if self.event() == Some(EventKind::ObjectDeleted) {
            return Ok(None);
        }
        match self.core.cache.lookup(self.snapshot.dn()) {
            Some(obj) if obj.instance() == self.snapshot.instance() => Ok(Some(obj)),
            _ => Err(StoreError::NotFound(self.snapshot.dn().to_string())),
        }
    }
}
