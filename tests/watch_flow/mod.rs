use std::sync::Arc;

use dme_engine::DmeHandler;
use dme_engine::DmeObject;
use dme_engine::StoreError;

use crate::common::manager;
use crate::common::trace_handler;
use crate::common::FLUSH_BUDGET;

/// Full lifecycle seen by one watcher: download burst, live updates,
/// deletion, then silence after unwatch.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_sees_ordered_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let manager = manager();
    manager.create("sys/intf/phys-[eth1/2]")?;
    manager.create("sys/intf/phys-[eth1/1]")?;
    manager.create("sys/intf/lo-[lo0]")?;

    let (trace, handler) = trace_handler();
    manager.watch_with("sys/intf", "phys-*", true, handler)?;

    manager.create("sys/intf/phys-[eth1/3]")?;
    let mut txn = manager.transaction();
    txn.set_property("sys/intf/phys-[eth1/1]", "admin_state", "up")?;
    txn.set_property("sys/intf/lo-[lo0]", "descr", "loopback")?;
    txn.commit()?;
    manager.delete("sys/intf/phys-[eth1/2]")?;
    manager.flush_timeout(FLUSH_BUDGET).await?;

    assert_eq!(trace.lines(), vec![
        "download:sys/intf/phys-[eth1/1]",
        "download:sys/intf/phys-[eth1/2]",
        "done:sys/intf",
        "added:sys/intf/phys-[eth1/3]",
        "changed:sys/intf/phys-[eth1/1]",
        "deleted:sys/intf/phys-[eth1/2]",
    ]);

    manager.unwatch("sys/intf", "phys-*")?;
    manager.create("sys/intf/phys-[eth1/4]")?;
    manager.flush_timeout(FLUSH_BUDGET).await?;
    assert_eq!(trace.lines().len(), 6);

    let err = manager.unwatch("sys/intf", "phys-*").unwrap_err();
    assert!(matches!(err.as_store(), Some(StoreError::NotWatched { .. })));

    manager.shutdown().await?;
    Ok(())
}

/// Handler that writes back into the store from inside its callback
struct Mirror;

impl DmeHandler for Mirror {
    fn on_object_event(
        &self,
        obj: &mut DmeObject,
    ) -> bool {
        if !obj.is_property_changed("admin_state") {
            return true;
        }
        let Some(state) = obj.get_property("admin_state").map(str::to_string) else {
            return true;
        };
        let descr = format!("admin {state}");
        obj.set_property("descr", &descr).is_ok() && obj.commit().is_ok()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handler_commit_triggers_follow_up_event() -> Result<(), Box<dyn std::error::Error>> {
    let manager = manager();
    manager.create("sys/intf/phys-[eth1/1]")?;

    let mirror: Arc<dyn DmeHandler> = Arc::new(Mirror);
    let (trace, tracer) = trace_handler();
    manager.watch_with("sys/intf", "phys-*", false, mirror)?;
    manager.watch_with("sys/intf", "phys-*", false, tracer)?;

    let mut txn = manager.transaction();
    txn.set_property("sys/intf/phys-[eth1/1]", "admin_state", "down")?;
    txn.commit()?;
    manager.flush_timeout(FLUSH_BUDGET).await?;
    // The mirror's own commit lands behind the first flush barrier
    manager.flush_timeout(FLUSH_BUDGET).await?;

    let obj = manager.get("sys/intf/phys-[eth1/1]")?;
    assert_eq!(obj.property("descr"), Some("admin down"));
    assert_eq!(trace.lines(), vec![
        "changed:sys/intf/phys-[eth1/1]",
        "changed:sys/intf/phys-[eth1/1]",
    ]);
    assert_eq!(manager.dispatch_stats().rejected, 0);

    manager.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_releases_handlers_and_keeps_store_usable() -> Result<(), Box<dyn std::error::Error>>
{
    let manager = manager();
    let (trace, handler) = trace_handler();
    manager.set_handler(handler);
    manager.watch("sys", "**", false)?;
    assert_eq!(manager.subscription_count(), 1);

    manager.shutdown().await?;
    // Idempotent
    manager.shutdown().await?;

    assert_eq!(manager.subscription_count(), 0);
    assert!(manager.handler().is_none());
    assert_eq!(Arc::strong_count(&trace), 1);

    manager.create("sys/late")?;
    assert!(manager.exists("sys/late"));
    assert!(manager.flush().await.is_err());
    Ok(())
}
