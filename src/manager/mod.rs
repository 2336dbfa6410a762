//! Manager facade
//!
//! [`DmeManager`] is constructed once per process and passed to whoever needs
//! the store. It owns the store core and the dispatcher task; dropping it or
//! calling [`DmeManager::shutdown`] stops dispatch.

mod builder;


pub use builder::DmeManagerBuilder;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::dispatch::DispatchStats;
use crate::dispatch::DispatchStatsSnapshot;
use crate::store::StoreCore;
use crate::txn::Transaction;
use crate::Dn;
use crate::DmeConfig;
use crate::DmeHandler;
use crate::DmeObject;
use crate::ManagedObject;
use crate::ObjectTree;
use crate::Result;
use crate::StoreError;
use crate::SystemError;

pub struct DmeManager {
    core: Arc<StoreCore>,
    config: Arc<DmeConfig>,
    stats: Arc<DispatchStats>,
    shutdown_tx: watch::Sender<()>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for DmeManager {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DmeManager")
            .field("core", &self.core)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

impl DmeManager {
    pub fn config(&self) -> &DmeConfig {
        &self.config
    }

    pub fn get(
        &self,
        dn: &str,
    ) -> Result<ManagedObject> {
        let dn = Dn::parse(dn)?;
        Ok(self.core.cache.get(&dn)?)
    }

    /// Handle over the current state of `dn`
    pub fn get_object(
        &self,
        dn: &str,
    ) -> Result<DmeObject> {
        let dn = Dn::parse(dn)?;
        let obj = self
            .core
            .cache
            .lookup(&dn)
            .ok_or_else(|| StoreError::NotFound(dn.to_string()))?;
        Ok(DmeObject::new(self.core.clone(), obj))
    }

    /// Create an empty object. The parent Dn need not exist.
    pub fn create(
        &self,
        dn: &str,
    ) -> Result<ManagedObject> {
        let dn = Dn::parse(dn)?;
        let obj = self.core.create(dn)?;
        Ok(obj.as_ref().clone())
    }

    /// Create an empty object and return a handle to it
    pub fn add_object(
        &self,
        dn: &str,
    ) -> Result<DmeObject> {
        let dn = Dn::parse(dn)?;
        let obj = self.core.create(dn)?;
        Ok(DmeObject::new(self.core.clone(), obj))
    }

    /// Delete one object. Descendants are left in place.
    pub fn delete(
        &self,
        dn: &str,
    ) -> Result<()> {
        let dn = Dn::parse(dn)?;
        self.core.delete(&dn)?;
        Ok(())
    }

    /// `false` for unknown and for malformed Dns
    pub fn exists(
        &self,
        dn: &str,
    ) -> bool {
        Dn::parse(dn).map(|dn| self.core.cache.exists(&dn)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.core.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.cache.is_empty()
    }

    /// `{"<dn>": {prop: value}}` for one object
    pub fn get_mo_json(
        &self,
        dn: &str,
    ) -> Result<String> {
        let dn = Dn::parse(dn)?;
        self.core.cache.mo_json(&dn)
    }

    /// Subtree rooted at `dn`, root included, keys sorted
    pub fn get_children_json(
        &self,
        dn: &str,
    ) -> Result<String> {
        let dn = Dn::parse(dn)?;
        self.core.cache.subtree_json(&dn)
    }

    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.core.clone())
    }

    /// Default handler used by [`DmeManager::watch`]
    pub fn set_handler(
        &self,
        handler: Arc<dyn DmeHandler>,
    ) {
        self.core.set_handler(handler);
    }

    pub fn handler(&self) -> Option<Arc<dyn DmeHandler>> {
        self.core.handler()
    }

    /// Watch `pattern` under `dn` with the default handler
    pub fn watch(
        &self,
        dn: &str,
        pattern: &str,
        download: bool,
    ) -> Result<()> {
        let base = Dn::parse(dn)?;
        self.core.watch(base, pattern, download, None)?;
        Ok(())
    }

    pub fn watch_with(
        &self,
        dn: &str,
        pattern: &str,
        download: bool,
        handler: Arc<dyn DmeHandler>,
    ) -> Result<()> {
        let base = Dn::parse(dn)?;
        self.core.watch(base, pattern, download, Some(handler))?;
        Ok(())
    }

    /// Remove every subscription registered for `(dn, pattern)`
    pub fn unwatch(
        &self,
        dn: &str,
        pattern: &str,
    ) -> Result<()> {
        let base = Dn::parse(dn)?;
        self.core.unwatch(&base, pattern, None)?;
        Ok(())
    }

    /// Remove the subscription of one handler for `(dn, pattern)`
    pub fn unwatch_with(
        &self,
        dn: &str,
        pattern: &str,
        handler: &Arc<dyn DmeHandler>,
    ) -> Result<()> {
        let base = Dn::parse(dn)?;
        self.core.unwatch(&base, pattern, Some(handler))?;
        Ok(())
    }

    pub fn subscription_count(&self) -> usize {
        self.core.subscription_count()
    }

    pub fn queue_depth(&self) -> usize {
        self.core.queue_depth()
    }

    pub fn dispatch_stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Wait until every event queued before this call has been delivered
    pub async fn flush(&self) -> Result<()> {
        let ack = self.core.request_flush()?;
        ack.await.map_err(|_| SystemError::DispatcherStopped)?;
        Ok(())
    }

    pub async fn flush_timeout(
        &self,
        budget: Duration,
    ) -> Result<()> {
        tokio::time::timeout(budget, self.flush())
            .await
            .map_err(|_| StoreError::Timeout(budget))?
    }

    /// Import a `{dn: {prop: value}}` document in Dn order. Missing objects
    /// are created; each object's properties are committed in their own
    /// transaction. Stops at the first failure: objects imported before it
    /// stay applied, and an object created for the failing entry is removed
    /// again. Returns the number of objects touched.
    pub fn import_json(
        &self,
        json: &str,
    ) -> Result<usize> {
        let tree: ObjectTree = serde_json::from_str(json).map_err(SystemError::Json)?;
        let mut imported = 0;
        for (raw, properties) in &tree {
            let dn = Dn::parse(raw)?;
            let mut txn = self.transaction();
            for (name, value) in properties {
                txn.stage(dn.clone(), name, value)?;
            }

            let created = !self.core.cache.exists(&dn);
            if created {
                self.core.create(dn.clone())?;
            }
            if let Err(e) = txn.commit() {
                if created {
                    if let Err(undo) = self.core.delete(&dn) {
                        warn!(dn = %dn, "Failed to remove partially imported object: {}", undo);
                    }
                }
                return Err(e);
            }
            imported += 1;
        }
        debug!(objects = imported, "Object tree imported");
        Ok(imported)
    }

    pub async fn import_file(
        &self,
        path: &Path,
    ) -> Result<usize> {
        let json = tokio::fs::read_to_string(path).await.map_err(SystemError::Io)?;
        let imported = self.import_json(&json)?;
        info!(path = %path.display(), objects = imported, "Seed objects loaded");
        Ok(imported)
    }

    /// Stop the dispatcher, drop queued events and release every handler.
    /// Store operations keep working afterwards; their events are dropped.
    pub async fn shutdown(&self) -> Result<()> {
        let handle = self.dispatcher.lock().take();
        let Some(handle) = handle else {
            debug!("Manager already shut down");
            return Ok(());
        };

        if self.shutdown_tx.send(()).is_err() {
            debug!("Dispatcher already exited");
        }
        handle.await.map_err(SystemError::TaskFailed)?;
        self.core.release_handlers();
        info!("DME manager stopped");
        Ok(())
    }
}
