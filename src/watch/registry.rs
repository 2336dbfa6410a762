//! Watch registry
//!
//! Holds the `(base dn, pattern, handler)` subscriptions. The registry itself
//! is not synchronized: it lives inside the store state and every access goes
//! through the store lock, which is what lets a download burst be queued
//! before any live event for the same subscription.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use super::DnPattern;
use crate::Dn;
use crate::DmeHandler;
use crate::StoreError;

/// Handler identity is the address of the shared handler value
pub(crate) fn same_handler(
    a: &Arc<dyn DmeHandler>,
    b: &Arc<dyn DmeHandler>,
) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

pub struct Subscription {
    id: u64,
    base: Dn,
    pattern: String,
    matcher: DnPattern,
    download: bool,
    handler: Arc<dyn DmeHandler>,
    /// Cleared on unwatch; queued events for inactive subscriptions are skipped
    active: AtomicBool,
}

impl fmt::Debug for Subscription {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("base", &self.base)
            .field("pattern", &self.pattern)
            .field("download", &self.download)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn base(&self) -> &Dn {
        &self.base
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn download(&self) -> bool {
        self.download
    }

    pub fn handler(&self) -> &Arc<dyn DmeHandler> {
        &self.handler
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn matches(
        &self,
        dn: &Dn,
    ) -> bool {
        self.matcher.matches(dn)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    fn same_key(
        &self,
        base: &Dn,
        pattern: &str,
    ) -> bool {
        &self.base == base && self.pattern == pattern
    }
}

#[derive(Debug, Default)]
pub struct WatchRegistry {
    /// In registration order, which is also the delivery order
    subscriptions: Vec<Arc<Subscription>>,
    next_id: u64,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription.
    ///
    /// Returns the subscription and whether it was newly created. An
    /// identical `(base, pattern, handler)` registration returns the existing
    /// subscription.
    pub fn register(
        &mut self,
        base: Dn,
        pattern: &str,
        download: bool,
        handler: Arc<dyn DmeHandler>,
    ) -> std::result::Result<(Arc<Subscription>, bool), StoreError> {
        if let Some(existing) = self
            .subscriptions
            .iter()
            .find(|s| s.same_key(&base, pattern) && same_handler(&s.handler, &handler))
        {
            trace!(subscription = existing.id, "Watch already registered");
            return Ok((existing.clone(), false));
        }

        let matcher = DnPattern::scoped(&base, pattern)?;
        self.next_id += 1;
        let subscription = Arc::new(Subscription {
            id: self.next_id,
            base,
            pattern: pattern.to_string(),
            matcher,
            download,
            handler,
            active: AtomicBool::new(true),
        });
        self.subscriptions.push(subscription.clone());

        debug!(
            subscription = subscription.id,
            base = %subscription.base,
            pattern = %subscription.pattern,
            download,
            "Watch registered"
        );
        Ok((subscription, true))
    }

    /// Remove subscriptions for `(base, pattern)`; limited to one handler when
    /// `handler` is given.
    pub fn unregister(
        &mut self,
        base: &Dn,
        pattern: &str,
        handler: Option<&Arc<dyn DmeHandler>>,
    ) -> std::result::Result<Vec<Arc<Subscription>>, StoreError> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.subscriptions).into_iter().partition(|s| {
                s.same_key(base, pattern) && handler.map_or(true, |h| same_handler(&s.handler, h))
            });
        self.subscriptions = kept;

        if removed.is_empty() {
            return Err(StoreError::NotWatched {
                dn: base.to_string(),
                pattern: pattern.to_string(),
            });
        }
        for s in &removed {
            s.deactivate();
            debug!(subscription = s.id, base = %base, pattern, "Watch removed");
        }
        Ok(removed)
    }

    /// Every subscription interested in `dn`, in registration order. A
    /// handler may appear through several subscriptions; the dispatcher
    /// delivers to it once, through the first one still active.
    pub fn matching(
        &self,
        dn: &Dn,
    ) -> Vec<Arc<Subscription>> {
        self.subscriptions.iter().filter(|s| s.matches(dn)).cloned().collect()
    }

    /// Remove every subscription, releasing the handler references
    pub fn clear(&mut self) -> usize {
        let removed = std::mem::take(&mut self.subscriptions);
        for s in &removed {
            s.deactivate();
        }
        removed.len()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &Arc<Subscription>> {
        self.subscriptions.iter()
    }
}
