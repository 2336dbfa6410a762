use std::io::Write;

use dme_engine::DmeConfig;
use dme_engine::DmeManagerBuilder;
use dme_engine::StoreError;

use crate::common::manager;
use crate::common::trace_handler;
use crate::common::FLUSH_BUDGET;

const SEED: &str = r#"{
    "sys": {},
    "sys/intf": {},
    "sys/intf/phys-[eth1/2]": {"admin_state": "down", "mtu": "1500"},
    "sys/intf/phys-[eth1/1]": {"admin_state": "up", "descr": "uplink"},
    "sys/bgp": {"asn": "65000"}
}"#;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_seed_file_round_trips_through_children_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("seed.json");
    std::fs::File::create(&path)?.write_all(SEED.as_bytes())?;

    let manager = manager();
    assert_eq!(manager.import_file(&path).await?, 5);
    assert_eq!(manager.len(), 5);

    assert_eq!(
        manager.get_children_json("sys/intf")?,
        concat!(
            r#"{"sys/intf":{},"#,
            r#""sys/intf/phys-[eth1/1]":{"admin_state":"up","descr":"uplink"},"#,
            r#""sys/intf/phys-[eth1/2]":{"admin_state":"down","mtu":"1500"}}"#
        )
    );

    // A second manager fed the exported tree ends up identical
    let export = manager.get_children_json("sys")?;
    let copy = manager_with_defaults();
    assert_eq!(copy.import_json(&export)?, 5);
    assert_eq!(copy.get_children_json("sys")?, export);

    manager.shutdown().await?;
    copy.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_import_notifies_watchers_in_dn_order() -> Result<(), Box<dyn std::error::Error>> {
    let manager = manager();
    let (trace, handler) = trace_handler();
    manager.watch_with("sys/intf", "phys-*", false, handler)?;

    manager.import_json(SEED)?;
    manager.flush_timeout(FLUSH_BUDGET).await?;

    assert_eq!(trace.lines(), vec![
        "added:sys/intf/phys-[eth1/1]",
        "changed:sys/intf/phys-[eth1/1]",
        "added:sys/intf/phys-[eth1/2]",
        "changed:sys/intf/phys-[eth1/2]",
    ]);

    manager.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_seed_value_stops_import() -> Result<(), Box<dyn std::error::Error>> {
    let manager = manager();
    let err = manager
        .import_json(r#"{"sys/intf/phys-[eth1/1]": {"mtu": "jumbo"}, "sys/intf/phys-[eth1/2]": {}}"#)
        .unwrap_err();
    assert!(matches!(err.as_store(), Some(StoreError::TransactionAborted { .. })));

    // Nothing from the failing entry or after it is left behind
    assert!(!manager.exists("sys/intf/phys-[eth1/1]"));
    assert!(!manager.exists("sys/intf/phys-[eth1/2]"));
    assert!(manager.is_empty());

    manager.shutdown().await?;
    Ok(())
}

fn manager_with_defaults() -> dme_engine::DmeManager {
    DmeManagerBuilder::new(DmeConfig::default())
        .build()
        .expect("manager builds")
}
