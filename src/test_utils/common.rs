use std::sync::Arc;
use std::time::Duration;

use crate::ClassDef;
use crate::Dn;
use crate::DmeConfig;
use crate::DmeManager;
use crate::DmeManagerBuilder;
use crate::PropertyDef;
use crate::Schema;

pub fn dn(raw: &str) -> Dn {
    Dn::parse(raw).unwrap()
}

pub fn test_config(handler_timeout_ms: u64) -> DmeConfig {
    let mut config = DmeConfig::default();
    config.dispatcher.handler_timeout_ms = handler_timeout_ms;
    config
}

/// Interfaces under `sys/intf` plus a strictly typed `sys/bgp` instance
pub fn interface_schema() -> Schema {
    Schema::new(vec![
        ClassDef::new("l1PhysIf", "sys/intf/phys-*")
            .with_property("admin_state", PropertyDef::enumeration(["up", "down"]))
            .with_property("mtu", PropertyDef::integer(Some(576), Some(9216)))
            .with_property("descr", PropertyDef::string())
            .with_property("oper_state", PropertyDef::string().read_only()),
        ClassDef::new("bgpInst", "sys/bgp")
            .with_property("asn", PropertyDef::integer(Some(1), Some(4_294_967_295)))
            .with_property("enabled", PropertyDef::boolean()),
    ])
    .unwrap()
}

pub fn test_manager() -> DmeManager {
    DmeManagerBuilder::new(test_config(1000)).build().unwrap()
}

pub fn schema_manager() -> DmeManager {
    DmeManagerBuilder::new(test_config(1000))
        .schema(interface_schema())
        .build()
        .unwrap()
}

/// Flush with a generous budget so a broken test fails instead of hanging
pub async fn settle(manager: &DmeManager) {
    manager.flush_timeout(Duration::from_secs(5)).await.unwrap();
}

pub fn shared<H: crate::DmeHandler>(handler: H) -> (Arc<H>, Arc<dyn crate::DmeHandler>) {
    let typed = Arc::new(handler);
    let erased: Arc<dyn crate::DmeHandler> = typed.clone();
    (typed, erased)
}
