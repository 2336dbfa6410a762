use std::sync::Arc;
use std::time::Duration;

use dme_engine::ClassDef;
use dme_engine::DmeConfig;
use dme_engine::DmeHandler;
use dme_engine::DmeManager;
use dme_engine::DmeManagerBuilder;
use dme_engine::DmeObject;
use dme_engine::Dn;
use dme_engine::EventKind;
use dme_engine::PropertyDef;
use dme_engine::Schema;
use parking_lot::Mutex;

pub const FLUSH_BUDGET: Duration = Duration::from_secs(5);

/// One line per callback, `"<kind>:<dn>"` or `"done:<dn>"`
#[derive(Debug, Default)]
pub struct TraceHandler {
    lines: Mutex<Vec<String>>,
}

impl TraceHandler {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl DmeHandler for TraceHandler {
    fn on_object_event(
        &self,
        obj: &mut DmeObject,
    ) -> bool {
        let kind = match obj.event() {
            Some(EventKind::ObjectAdded) if obj.is_download() => "download",
            Some(EventKind::ObjectAdded) => "added",
            Some(EventKind::PropertyChanged) => "changed",
            Some(EventKind::ObjectDeleted) => "deleted",
            None => "none",
        };
        self.lines.lock().push(format!("{kind}:{}", obj.dn()));
        true
    }

    fn on_download_done(
        &self,
        dn: &Dn,
    ) {
        self.lines.lock().push(format!("done:{dn}"));
    }
}

pub fn interface_schema() -> Schema {
    Schema::new(vec![
        ClassDef::new("l1PhysIf", "sys/intf/phys-*")
            .with_property("admin_state", PropertyDef::enumeration(["up", "down"]))
            .with_property("mtu", PropertyDef::integer(Some(576), Some(9216)))
            .with_property("descr", PropertyDef::string()),
    ])
    .expect("valid schema")
}

pub fn manager() -> DmeManager {
    let mut config = DmeConfig::default();
    config.dispatcher.handler_timeout_ms = 1000;
    DmeManagerBuilder::new(config)
        .schema(interface_schema())
        .build()
        .expect("manager builds")
}

pub fn trace_handler() -> (Arc<TraceHandler>, Arc<dyn DmeHandler>) {
    let handler = Arc::new(TraceHandler::default());
    let shared: Arc<dyn DmeHandler> = handler.clone();
    (handler, shared)
}
