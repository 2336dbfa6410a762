//! Event dispatcher
//!
//! A single tokio task drains the dispatch queue in FIFO order. Every handler
//! call runs on the blocking pool under the configured budget; the worker
//! waits for one call to finish (or to be abandoned) before starting the
//! next, so a handler never sees two events concurrently unless an earlier
//! call of it was abandoned.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::DispatchItem;
use super::DmeEvent;
use super::EventReceiver;
use crate::metrics::HANDLER_LATENCY_METRIC;
use crate::metrics::HANDLER_OUTCOME_METRIC;
use crate::store::StoreCore;
use crate::watch::same_handler;
use crate::Dn;
use crate::DmeObject;
use crate::HandlerError;
use crate::Subscription;

/// Counters describing what the dispatcher did with each handler call
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    rejected: AtomicU64,
    timed_out: AtomicU64,
    panicked: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
    downloads_done: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    /// `on_object_event` returned `true`
    pub delivered: u64,
    /// `on_object_event` returned `false`
    pub rejected: u64,
    /// Handler calls abandoned after exceeding the budget
    pub timed_out: u64,
    pub panicked: u64,
    /// Deliveries skipped because the subscription was removed
    pub skipped: u64,
    /// Items discarded at shutdown
    pub dropped: u64,
    /// `on_download_done` calls completed
    pub downloads_done: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            downloads_done: self.downloads_done.load(Ordering::Relaxed),
        }
    }

    fn bump(
        counter: &AtomicU64,
        outcome: &str,
    ) {
        counter.fetch_add(1, Ordering::Relaxed);
        HANDLER_OUTCOME_METRIC.with_label_values(&[outcome]).inc();
    }
}

pub(crate) struct EventDispatcher {
    core: Weak<StoreCore>,
    receiver: EventReceiver,
    handler_timeout: Duration,
    stats: Arc<DispatchStats>,
    shutdown_signal: watch::Receiver<()>,
}

impl EventDispatcher {
    pub(crate) fn new(
        core: Weak<StoreCore>,
        receiver: EventReceiver,
        handler_timeout: Duration,
        stats: Arc<DispatchStats>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            core,
            receiver,
            handler_timeout,
            stats,
            shutdown_signal,
        }
    }

    /// Main loop; runs until the shutdown signal fires or the store is gone.
    pub(crate) async fn run(mut self) {
        info!(budget = ?self.handler_timeout, "Event dispatcher started");

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_signal.changed() => {
                    info!("Event dispatcher received shutdown signal");
                    break;
                }

                item = self.receiver.recv() => {
                    match item {
                        Some(item) => {
                            if !self.handle(item).await {
                                break;
                            }
                        }
                        None => {
                            debug!("Dispatch queue closed");
                            break;
                        }
                    }
                }
            }
        }

        let dropped = self.receiver.close_and_drain();
        if dropped > 0 {
            warn!(dropped, "Dropped queued events at shutdown");
        }
        self.stats.dropped.fetch_add(dropped as u64, Ordering::Relaxed);

        if let Some(core) = self.core.upgrade() {
            core.release_handlers();
        }
        info!("Event dispatcher stopped");
    }

    /// Returns false once the store has been dropped
    async fn handle(
        &self,
        item: DispatchItem,
    ) -> bool {
        match item {
            DispatchItem::Event { event, targets } => {
                for (i, target) in targets.iter().enumerate() {
                    let handler = target.handler();
                    // Each handler is called once, through its first active subscription
                    if targets[..i].iter().any(|t| same_handler(t.handler(), handler)) {
                        continue;
                    }
                    let live = targets[i..]
                        .iter()
                        .filter(|t| same_handler(t.handler(), handler))
                        .find(|t| t.is_active());
                    let Some(live) = live else {
                        trace!(subscription = target.id(), "Skipping event for removed watch");
                        self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                        continue;
                    };
                    let Some(core) = self.core.upgrade() else {
                        return false;
                    };
                    self.deliver(core, &event, live).await;
                }
            }
            DispatchItem::DownloadDone { dn, target } => {
                if target.is_active() {
                    self.download_done(dn, &target).await;
                } else {
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                }
            }
            DispatchItem::Flush(ack) => {
                let _ = ack.send(());
            }
        }
        true
    }

    async fn deliver(
        &self,
        core: Arc<StoreCore>,
        event: &DmeEvent,
        target: &Arc<Subscription>,
    ) {
        let subscription = target.id();
        let kind = event.kind().as_str();
        let dn = event.object().dn().clone();
        let handler = target.handler().clone();
        let mut obj = DmeObject::from_event(core, event.clone());

        let started = Instant::now();
        let call = tokio::task::spawn_blocking(move || handler.on_object_event(&mut obj));
        let outcome = timeout(self.handler_timeout, call).await;
        HANDLER_LATENCY_METRIC
            .with_label_values(&[kind])
            .observe(started.elapsed().as_secs_f64() * 1000.0);

        match outcome {
            Ok(Ok(true)) => {
                trace!(subscription, dn = %dn, kind, "Event delivered");
                DispatchStats::bump(&self.stats.delivered, "delivered");
            }
            Ok(Ok(false)) => {
                let e = HandlerError::Rejected { subscription };
                warn!(dn = %dn, kind, "{}", e);
                DispatchStats::bump(&self.stats.rejected, "rejected");
            }
            Ok(Err(source)) => {
                let e = HandlerError::Panicked {
                    subscription,
                    source,
                };
                warn!(dn = %dn, kind, "{}", e);
                DispatchStats::bump(&self.stats.panicked, "panicked");
            }
            Err(_) => {
                let e = HandlerError::Timeout {
                    subscription,
                    budget: self.handler_timeout,
                };
                warn!(dn = %dn, kind, "{}", e);
                DispatchStats::bump(&self.stats.timed_out, "timeout");
            }
        }
    }

    async fn download_done(
        &self,
        dn: Dn,
        target: &Arc<Subscription>,
    ) {
        let subscription = target.id();
        let handler = target.handler().clone();
        let base = dn.clone();
        let call = tokio::task::spawn_blocking(move || handler.on_download_done(&base));

        match timeout(self.handler_timeout, call).await {
            Ok(Ok(())) => {
                debug!(subscription, dn = %dn, "Download done delivered");
                DispatchStats::bump(&self.stats.downloads_done, "download_done");
            }
            Ok(Err(source)) => {
                let e = HandlerError::Panicked {
                    subscription,
                    source,
                };
                warn!(dn = %dn, "{}", e);
                DispatchStats::bump(&self.stats.panicked, "panicked");
            }
            Err(_) => {
                let e = HandlerError::Timeout {
                    subscription,
                    budget: self.handler_timeout,
                };
                warn!(dn = %dn, "{}", e);
                DispatchStats::bump(&self.stats.timed_out, "timeout");
            }
        }
    }
}
