use std::collections::BTreeSet;
use std::sync::Arc;

use crate::ManagedObject;

/// Lifecycle of a managed object as seen by handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ObjectAdded,
    PropertyChanged,
    ObjectDeleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ObjectAdded => "added",
            EventKind::PropertyChanged => "changed",
            EventKind::ObjectDeleted => "deleted",
        }
    }
}

/// Event for one object
///
/// `object` is the state right after the change; for `ObjectDeleted` it is
/// the final state before removal.
#[derive(Debug, Clone)]
pub struct DmeEvent {
    kind: EventKind,
    object: Arc<ManagedObject>,
    changed: BTreeSet<String>,
    /// Synthetic event produced by a watch download
    download: bool,
}

impl DmeEvent {
    pub(crate) fn added(object: Arc<ManagedObject>) -> Self {
        Self {
            kind: EventKind::ObjectAdded,
            object,
            changed: BTreeSet::new(),
            download: false,
        }
    }

    pub(crate) fn downloaded(object: Arc<ManagedObject>) -> Self {
        Self {
            download: true,
            ..Self::added(object)
        }
    }

    pub(crate) fn property_changed(
        object: Arc<ManagedObject>,
        changed: BTreeSet<String>,
    ) -> Self {
        Self {
            kind: EventKind::PropertyChanged,
            object,
            changed,
            download: false,
        }
    }

    pub(crate) fn deleted(object: Arc<ManagedObject>) -> Self {
        Self {
            kind: EventKind::ObjectDeleted,
            object,
            changed: BTreeSet::new(),
            download: false,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn object(&self) -> &Arc<ManagedObject> {
        &self.object
    }

    /// Properties touched by the triggering update
    pub fn changed(&self) -> &BTreeSet<String> {
        &self.changed
    }

    pub fn is_download(&self) -> bool {
        self.download
    }
}
