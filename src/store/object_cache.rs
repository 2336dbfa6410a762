//! In-memory object cache
//!
//! Readers load the current map through `arc_swap` and never block.
//! Writers build a new map and publish it; they are serialized by the store
//! lock held in [`crate::store::StoreCore`].

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::trace;

use super::ManagedObject;
use crate::Dn;
use crate::Result;
use crate::StoreError;
use crate::SystemError;

pub type ObjectMap = BTreeMap<Dn, Arc<ManagedObject>>;

/// Dn -> property map, the serialized form of objects and subtrees
pub type ObjectTree = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug)]
pub struct ObjectCache {
    objects: ArcSwap<ObjectMap>,
    next_instance: AtomicU64,
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectCache {
    pub fn new() -> Self {
        Self {
            objects: ArcSwap::from_pointee(ObjectMap::new()),
            next_instance: AtomicU64::new(1),
        }
    }

    /// Point-in-time view of every object
    pub fn snapshot(&self) -> Arc<ObjectMap> {
        self.objects.load_full()
    }

    pub fn len(&self) -> usize {
        self.objects.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lookup(
        &self,
        dn: &Dn,
    ) -> Option<Arc<ManagedObject>> {
        self.objects.load().get(dn).cloned()
    }

    pub fn get(
        &self,
        dn: &Dn,
    ) -> std::result::Result<ManagedObject, StoreError> {
        self.lookup(dn)
            .map(|obj| obj.as_ref().clone())
            .ok_or_else(|| StoreError::NotFound(dn.to_string()))
    }

    pub fn exists(
        &self,
        dn: &Dn,
    ) -> bool {
        self.objects.load().contains_key(dn)
    }

    /// `{dn: {prop: value}}` for a single object
    pub fn mo_json(
        &self,
        dn: &Dn,
    ) -> Result<String> {
        let obj = self.lookup(dn).ok_or_else(|| StoreError::NotFound(dn.to_string()))?;
        let mut tree = ObjectTree::new();
        tree.insert(dn.to_string(), obj.properties().clone());
        render(&tree)
    }

    /// Subtree rooted at `dn` (root included), sorted by Dn
    pub fn subtree(
        &self,
        dn: &Dn,
    ) -> std::result::Result<Vec<Arc<ManagedObject>>, StoreError> {
        let objects = self.snapshot();
        if !objects.contains_key(dn) {
            return Err(StoreError::NotFound(dn.to_string()));
        }
        // Every Dn in the subtree has `dn` as a string prefix and the
        // prefixed keys are contiguous in the ordered map.
        Ok(objects
            .range(dn.clone()..)
            .take_while(|(key, _)| key.as_str().starts_with(dn.as_str()))
            .filter(|(key, _)| dn.contains(key))
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    pub fn subtree_json(
        &self,
        dn: &Dn,
    ) -> Result<String> {
        let tree: ObjectTree = self
            .subtree(dn)?
            .into_iter()
            .map(|obj| (obj.dn().to_string(), obj.properties().clone()))
            .collect();
        render(&tree)
    }

    pub(crate) fn next_instance(&self) -> u64 {
        self.next_instance.fetch_add(1, Ordering::Relaxed)
    }

    /// Insert a new empty object. Caller holds the store lock.
    pub(crate) fn insert_new(
        &self,
        dn: Dn,
        class: Option<String>,
    ) -> std::result::Result<Arc<ManagedObject>, StoreError> {
        let current = self.snapshot();
        if current.contains_key(&dn) {
            return Err(StoreError::AlreadyExists(dn.to_string()));
        }
        let obj = Arc::new(ManagedObject::new(dn.clone(), class, self.next_instance()));
        let mut next = current.as_ref().clone();
        next.insert(dn, obj.clone());
        self.publish(next);
        trace!(dn = %obj.dn(), instance = obj.instance(), "Object inserted");
        Ok(obj)
    }

    /// Remove an object and return its final state. Caller holds the store lock.
    pub(crate) fn remove(
        &self,
        dn: &Dn,
    ) -> std::result::Result<Arc<ManagedObject>, StoreError> {
        let current = self.snapshot();
        let mut next = current.as_ref().clone();
        let removed = next.remove(dn).ok_or_else(|| StoreError::NotFound(dn.to_string()))?;
        self.publish(next);
        trace!(dn = %dn, instance = removed.instance(), "Object removed");
        Ok(removed)
    }

    /// Replace the whole map. Caller holds the store lock.
    pub(crate) fn publish(
        &self,
        objects: ObjectMap,
    ) {
        self.objects.store(Arc::new(objects));
    }
}

pub(crate) fn render(tree: &ObjectTree) -> Result<String> {
    serde_json::to_string(tree).map_err(|e| SystemError::Json(e).into())
}
