use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Duration;

use parking_lot::Mutex;

use crate::Dn;
use crate::DmeHandler;
use crate::DmeObject;
use crate::EventKind;

/// What a handler saw for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub dn: String,
    pub kind: EventKind,
    pub changed: BTreeSet<String>,
    pub download: bool,
    pub properties: BTreeMap<String, String>,
}

/// Handler that records every callback, optionally misbehaving
#[derive(Debug, Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<Recorded>>,
    downloads_done: Mutex<Vec<String>>,
    /// Value returned from `on_object_event`
    reject: bool,
    /// Sleep this long inside every callback
    delay: Option<Duration>,
    /// Panic when an event for this Dn arrives
    panic_on: Option<String>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn panicking_on(dn: &str) -> Self {
        Self {
            panic_on: Some(dn.to_string()),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    /// `(kind, dn)` pairs in delivery order
    pub fn trace(&self) -> Vec<(EventKind, String)> {
        self.events.lock().iter().map(|e| (e.kind, e.dn.clone())).collect()
    }

    pub fn downloads_done(&self) -> Vec<String> {
        self.downloads_done.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

impl DmeHandler for RecordingHandler {
    fn on_object_event(
        &self,
        obj: &mut DmeObject,
    ) -> bool {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.panic_on.as_deref() == Some(obj.dn().as_str()) {
            panic!("handler asked to panic on {}", obj.dn());
        }

        let mut changed = BTreeSet::new();
        let mut first = true;
        while let Some(name) = obj.iterate_changed_properties(first) {
            changed.insert(name);
            first = false;
        }

        self.events.lock().push(Recorded {
            dn: obj.dn().to_string(),
            kind: obj.event().unwrap_or(EventKind::ObjectAdded),
            changed,
            download: obj.is_download(),
            properties: obj.properties().clone(),
        });
        !self.reject
    }

    fn on_download_done(
        &self,
        dn: &Dn,
    ) {
        self.downloads_done.lock().push(dn.to_string());
    }
}
