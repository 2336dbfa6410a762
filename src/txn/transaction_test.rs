use std::sync::Arc;

use super::Transaction;
use crate::dispatch::EventQueue;
use crate::store::StoreCore;
use crate::test_utils::dn;
use crate::test_utils::interface_schema;
use crate::StoreConfig;
use crate::StoreError;

fn core(max_transaction_size: usize) -> Arc<StoreCore> {
    let (queue, receiver) = EventQueue::channel(1000);
    // No dispatcher in these tests; events are dropped
    drop(receiver);
    let config = StoreConfig {
        max_transaction_size,
        ..StoreConfig::default()
    };
    let core = Arc::new(StoreCore::new(interface_schema(), config, queue));
    core.create(dn("sys/intf/phys-[eth1/1]")).unwrap();
    core.create(dn("sys/intf/phys-[eth1/2]")).unwrap();
    core
}

#[test]
fn test_staging_rejects_bad_input_immediately() {
    let mut txn = Transaction::new(core(10));

    let err = txn.set_property("sys//x", "mtu", "1500").unwrap_err();
    assert!(matches!(err.as_store(), Some(StoreError::InvalidDn { .. })));

    let err = txn.set_property("sys/intf/phys-[eth1/1]", "  ", "1500").unwrap_err();
    assert!(matches!(err.as_store(), Some(StoreError::InvalidProperty { .. })));
    assert!(txn.is_empty());
}

#[test]
fn test_staging_does_not_check_existence() {
    let mut txn = Transaction::new(core(10));
    txn.set_property("sys/absent", "mtu", "1500").unwrap();
    assert_eq!(txn.len(), 1);
    assert_eq!(txn.staged()[0].dn, dn("sys/absent"));
}

#[test]
fn test_staging_limit() {
    let mut txn = Transaction::new(core(2));
    txn.set_property("sys/intf/phys-[eth1/1]", "mtu", "1500").unwrap();
    txn.set_property("sys/intf/phys-[eth1/1]", "descr", "a").unwrap();
    let err = txn.set_property("sys/intf/phys-[eth1/1]", "descr", "b").unwrap_err();
    assert_eq!(err.as_store(), Some(&StoreError::TransactionTooLarge { limit: 2 }));
}

#[test]
fn test_commit_is_all_or_nothing() {
    let core = core(10);
    let mut txn = Transaction::new(core.clone());
    txn.set_property("sys/intf/phys-[eth1/1]", "admin_state", "down").unwrap();
    txn.set_property("sys/intf/phys-[eth1/2]", "mtu", "not-a-number").unwrap();

    let err = txn.commit().unwrap_err();
    assert!(matches!(err.as_store(), Some(StoreError::TransactionAborted { .. })));
    assert!(txn.is_empty(), "staged list is consumed on failure");

    let untouched = core.cache.get(&dn("sys/intf/phys-[eth1/1]")).unwrap();
    assert_eq!(untouched.property("admin_state"), None);
}

#[test]
fn test_commit_applies_and_reports_changed_objects() {
    let core = core(10);
    let mut txn = Transaction::new(core.clone());
    txn.set_property("sys/intf/phys-[eth1/2]", "admin_state", "up").unwrap();
    txn.set_property("sys/intf/phys-[eth1/1]", "admin_state", "up").unwrap();

    let receipt = txn.commit().unwrap();
    assert_eq!(receipt.changed, vec![dn("sys/intf/phys-[eth1/2]"), dn("sys/intf/phys-[eth1/1]")]);
    assert!(txn.is_empty());

    // Same values again: commits, but nothing changed
    txn.set_property("sys/intf/phys-[eth1/1]", "admin_state", "up").unwrap();
    let again = txn.commit().unwrap();
    assert!(again.changed.is_empty());
    assert!(again.commit_id > receipt.commit_id);
}

#[test]
fn test_empty_transaction_commits_trivially() {
    let mut txn = Transaction::new(core(10));
    let receipt = txn.commit().unwrap();
    assert!(receipt.changed.is_empty());
}

#[test]
fn test_clear_drops_staged_mutations() {
    let mut txn = Transaction::new(core(10));
    txn.set_property("sys/intf/phys-[eth1/1]", "mtu", "1500").unwrap();
    txn.clear();
    assert!(txn.is_empty());
    assert!(txn.commit().unwrap().changed.is_empty());
}
