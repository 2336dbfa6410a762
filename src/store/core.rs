//! Store core
//!
//! Owns the object cache, the schema, the watch registry and the producer
//! side of the dispatch queue. A single mutex serializes every mutation
//! together with the enqueue of its events, so the queue order is the
//! mutation order.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::ManagedObject;
use super::ObjectCache;
use crate::dispatch::DispatchItem;
use crate::dispatch::DmeEvent;
use crate::dispatch::EventQueue;
use crate::metrics::COMMIT_LATENCY_METRIC;
use crate::metrics::COMMIT_METRIC;
use crate::metrics::OBJECT_COUNT_METRIC;
use crate::txn;
use crate::txn::CommitReceipt;
use crate::txn::StagedMutation;
use crate::watch::WatchRegistry;
use crate::Dn;
use crate::DmeHandler;
use crate::Result;
use crate::Schema;
use crate::StoreConfig;
use crate::StoreError;
use crate::Subscription;
use crate::SystemError;

struct StoreState {
    registry: WatchRegistry,
    default_handler: Option<Arc<dyn DmeHandler>>,
    next_commit_id: u64,
}

pub(crate) struct StoreCore {
    pub(crate) cache: ObjectCache,
    pub(crate) schema: Schema,
    pub(crate) config: StoreConfig,
    queue: EventQueue,
    state: Mutex<StoreState>,
}

impl std::fmt::Debug for StoreCore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("StoreCore")
            .field("objects", &self.cache.len())
            .field("schema_classes", &self.schema.len())
            .field("queue_depth", &self.queue.depth())
            .finish_non_exhaustive()
    }
}

impl StoreCore {
    pub(crate) fn new(
        schema: Schema,
        config: StoreConfig,
        queue: EventQueue,
    ) -> Self {
        Self {
            cache: ObjectCache::new(),
            schema,
            config,
            queue,
            state: Mutex::new(StoreState {
                registry: WatchRegistry::new(),
                default_handler: None,
                next_commit_id: 1,
            }),
        }
    }

    pub(crate) fn create(
        &self,
        dn: Dn,
    ) -> std::result::Result<Arc<ManagedObject>, StoreError> {
        let state = self.state.lock();
        let class = self.schema.class_for(&dn).map(|c| c.name.clone());
        let obj = self.cache.insert_new(dn, class)?;
        OBJECT_COUNT_METRIC.set(self.cache.len() as i64);
        debug!(dn = %obj.dn(), class = ?obj.class(), "Object created");

        self.publish_event(&state, DmeEvent::added(obj.clone()));
        Ok(obj)
    }

    pub(crate) fn delete(
        &self,
        dn: &Dn,
    ) -> std::result::Result<Arc<ManagedObject>, StoreError> {
        let state = self.state.lock();
        let obj = self.cache.remove(dn)?;
        OBJECT_COUNT_METRIC.set(self.cache.len() as i64);
        debug!(dn = %dn, "Object deleted");

        self.publish_event(&state, DmeEvent::deleted(obj.clone()));
        Ok(obj)
    }

    /// Validate, apply and queue events for a batch of staged mutations
    pub(crate) fn commit(
        &self,
        staged: Vec<StagedMutation>,
    ) -> Result<CommitReceipt> {
        let started = Instant::now();
        let mut state = self.state.lock();
        let commit_id = state.next_commit_id;

        if staged.is_empty() {
            state.next_commit_id += 1;
            trace!(commit_id, "Empty transaction committed");
            return Ok(CommitReceipt {
                commit_id,
                changed: Vec::new(),
            });
        }

        let current = self.cache.snapshot();
        if let Err(e) = txn::validate(&current, &self.schema, &staged) {
            COMMIT_METRIC.with_label_values(&["aborted"]).inc();
            debug!(commit_id, error = %e, "Transaction aborted");
            return Err(e.into());
        }

        let (next, changes) = txn::apply(&current, &staged);
        self.cache.publish(next);
        state.next_commit_id += 1;

        let mut changed = Vec::with_capacity(changes.len());
        for change in changes {
            changed.push(change.object.dn().clone());
            self.publish_event(&state, DmeEvent::property_changed(change.object, change.changed));
        }

        COMMIT_METRIC.with_label_values(&["committed"]).inc();
        COMMIT_LATENCY_METRIC.observe(started.elapsed().as_micros() as f64);
        debug!(
            commit_id,
            mutations = staged.len(),
            objects = changed.len(),
            elapsed = ?started.elapsed(),
            "Transaction committed"
        );
        Ok(CommitReceipt { commit_id, changed })
    }

    /// Register a watch. With `download`, the burst of synthetic events and
    /// the download-done marker are queued before the lock is released, so
    /// they precede any live event for the subscription.
    pub(crate) fn watch(
        &self,
        base: Dn,
        pattern: &str,
        download: bool,
        handler: Option<Arc<dyn DmeHandler>>,
    ) -> std::result::Result<Arc<Subscription>, StoreError> {
        let mut state = self.state.lock();
        let handler = handler
            .or_else(|| state.default_handler.clone())
            .ok_or(StoreError::NoHandler)?;
        let (subscription, _created) = state.registry.register(base, pattern, download, handler)?;

        if download {
            let objects = self.cache.snapshot();
            let mut count = 0usize;
            for obj in objects.values().filter(|obj| subscription.matches(obj.dn())) {
                self.queue.push(DispatchItem::Event {
                    event: DmeEvent::downloaded(obj.clone()),
                    targets: vec![subscription.clone()],
                });
                count += 1;
            }
            self.queue.push(DispatchItem::DownloadDone {
                dn: subscription.base().clone(),
                target: subscription.clone(),
            });
            debug!(subscription = subscription.id(), objects = count, "Download queued");
        }

        Ok(subscription)
    }

    pub(crate) fn unwatch(
        &self,
        base: &Dn,
        pattern: &str,
        handler: Option<&Arc<dyn DmeHandler>>,
    ) -> std::result::Result<usize, StoreError> {
        let mut state = self.state.lock();
        let removed = state.registry.unregister(base, pattern, handler)?;
        Ok(removed.len())
    }

    pub(crate) fn set_handler(
        &self,
        handler: Arc<dyn DmeHandler>,
    ) {
        self.state.lock().default_handler = Some(handler);
    }

    pub(crate) fn handler(&self) -> Option<Arc<dyn DmeHandler>> {
        self.state.lock().default_handler.clone()
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    pub(crate) fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    /// Queue a barrier behind everything queued so far
    pub(crate) fn request_flush(&self) -> Result<oneshot::Receiver<()>> {
        let (tx, rx) = oneshot::channel();
        let _state = self.state.lock();
        if !self.queue.push(DispatchItem::Flush(tx)) {
            return Err(SystemError::DispatcherStopped.into());
        }
        Ok(rx)
    }

    /// Drop every subscription and the default handler
    pub(crate) fn release_handlers(&self) {
        let mut state = self.state.lock();
        let removed = state.registry.clear();
        state.default_handler = None;
        info!(subscriptions = removed, "Released handlers");
    }

    /// Queue `event` for the subscriptions matching its object. Caller holds
    /// the state lock.
    fn publish_event(
        &self,
        state: &StoreState,
        event: DmeEvent,
    ) {
        let targets = state.registry.matching(event.object().dn());
        if targets.is_empty() {
            trace!(dn = %event.object().dn(), kind = event.kind().as_str(), "No watchers");
            return;
        }
        if !self.queue.push(DispatchItem::Event { event, targets }) {
            warn!("Event dropped, dispatcher is not running");
        }
    }
}
