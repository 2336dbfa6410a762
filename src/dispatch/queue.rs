use std::fmt;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tracing::warn;

use super::DmeEvent;
use crate::metrics::EVENT_QUEUE_DEPTH_METRIC;
use crate::metrics::EVENT_QUEUED_METRIC;
use crate::Dn;
use crate::Subscription;

pub(crate) enum DispatchItem {
    /// Object event with the subscriptions that matched when it was queued
    Event {
        event: DmeEvent,
        targets: Vec<Arc<Subscription>>,
    },
    /// End of a download burst for one subscription
    DownloadDone {
        dn: Dn,
        target: Arc<Subscription>,
    },
    /// Barrier acknowledged once everything queued before it is delivered
    Flush(oneshot::Sender<()>),
}

impl fmt::Debug for DispatchItem {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            DispatchItem::Event { event, targets } => f
                .debug_struct("Event")
                .field("kind", &event.kind())
                .field("dn", event.object().dn())
                .field("targets", &targets.len())
                .finish(),
            DispatchItem::DownloadDone { dn, target } => f
                .debug_struct("DownloadDone")
                .field("dn", dn)
                .field("subscription", &target.id())
                .finish(),
            DispatchItem::Flush(_) => f.write_str("Flush"),
        }
    }
}

/// Sending side of the dispatch queue, fed under the store lock
#[derive(Debug, Clone)]
pub(crate) struct EventQueue {
    tx: mpsc::UnboundedSender<DispatchItem>,
    depth: Arc<AtomicUsize>,
    warn_threshold: usize,
}

/// Receiving side, owned by the dispatcher task
#[derive(Debug)]
pub(crate) struct EventReceiver {
    rx: mpsc::UnboundedReceiver<DispatchItem>,
    depth: Arc<AtomicUsize>,
}

impl EventQueue {
    pub(crate) fn channel(warn_threshold: usize) -> (EventQueue, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        (
            EventQueue {
                tx,
                depth: depth.clone(),
                warn_threshold,
            },
            EventReceiver { rx, depth },
        )
    }

    /// Queue an item without blocking. Returns false when the dispatcher is
    /// gone and the item was dropped.
    pub(crate) fn push(
        &self,
        item: DispatchItem,
    ) -> bool {
        let kind = match &item {
            DispatchItem::Event { event, .. } => event.kind().as_str(),
            DispatchItem::DownloadDone { .. } => "download_done",
            DispatchItem::Flush(_) => "flush",
        };

        // Counted before the send so the receiver never decrements first
        let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        if let Err(e) = self.tx.send(item) {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            warn!(item = ?e.0, "Event dispatcher stopped, dropping item");
            return false;
        }

        EVENT_QUEUED_METRIC.with_label_values(&[kind]).inc();
        EVENT_QUEUE_DEPTH_METRIC.set(depth as i64);
        if depth == self.warn_threshold {
            warn!(depth, "Event queue depth reached warning threshold");
        }
        true
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }
}

impl EventReceiver {
    pub(crate) async fn recv(&mut self) -> Option<DispatchItem> {
        let item = self.rx.recv().await;
        if item.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        item
    }

    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<DispatchItem> {
        let item = self.rx.try_recv().ok();
        if item.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        item
    }

    /// Close the queue and discard whatever is left; returns how many items
    /// were dropped. Pending flush barriers resolve with an error.
    pub(crate) fn close_and_drain(&mut self) -> usize {
        self.rx.close();
        let mut dropped = 0;
        while let Ok(item) = self.rx.try_recv() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            if !matches!(item, DispatchItem::Flush(_)) {
                dropped += 1;
            }
        }
        EVENT_QUEUE_DEPTH_METRIC.set(0);
        dropped
    }
}
