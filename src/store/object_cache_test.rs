use super::ObjectCache;
use crate::test_utils::dn;
use crate::StoreError;

fn seeded() -> ObjectCache {
    let cache = ObjectCache::new();
    for raw in [
        "sys",
        "sys/intf",
        "sys/intf/phys-[eth1/1]",
        "sys/intf/phys-[eth1/2]",
        "sys/intf-mgmt",
        "sys/intf0",
        "sys/bgp",
    ] {
        cache.insert_new(dn(raw), None).unwrap();
    }
    cache
}

#[test]
fn test_get_unknown_dn_is_not_found() {
    let cache = ObjectCache::new();
    assert_eq!(cache.get(&dn("sys")), Err(StoreError::NotFound("sys".into())));
    assert!(!cache.exists(&dn("sys")));
}

#[test]
fn test_insert_creates_empty_object_once() {
    let cache = ObjectCache::new();
    let obj = cache.insert_new(dn("sys/intf/phys-[eth1/1]"), None).unwrap();
    assert!(obj.properties().is_empty());
    assert!(cache.exists(&dn("sys/intf/phys-[eth1/1]")));

    let err = cache.insert_new(dn("sys/intf/phys-[eth1/1]"), None).unwrap_err();
    assert_eq!(err, StoreError::AlreadyExists("sys/intf/phys-[eth1/1]".into()));
}

#[test]
fn test_recreated_object_gets_new_instance() {
    let cache = ObjectCache::new();
    let first = cache.insert_new(dn("sys"), None).unwrap();
    cache.remove(&dn("sys")).unwrap();
    let second = cache.insert_new(dn("sys"), None).unwrap();
    assert_ne!(first.instance(), second.instance());
}

#[test]
fn test_remove_does_not_cascade() {
    let cache = seeded();
    cache.remove(&dn("sys/intf")).unwrap();
    assert!(!cache.exists(&dn("sys/intf")));
    assert!(cache.exists(&dn("sys/intf/phys-[eth1/1]")));
    assert_eq!(cache.remove(&dn("sys/intf")), Err(StoreError::NotFound("sys/intf".into())));
}

#[test]
fn test_snapshot_is_isolated_from_later_writes() {
    let cache = seeded();
    let before = cache.snapshot();
    cache.insert_new(dn("sys/new"), None).unwrap();
    assert!(!before.contains_key(&dn("sys/new")));
    assert_eq!(cache.len(), before.len() + 1);
}

#[test]
fn test_subtree_includes_root_and_skips_prefix_siblings() {
    let cache = seeded();
    let subtree: Vec<String> = cache
        .subtree(&dn("sys/intf"))
        .unwrap()
        .iter()
        .map(|o| o.dn().to_string())
        .collect();
    assert_eq!(
        subtree,
        vec!["sys/intf", "sys/intf/phys-[eth1/1]", "sys/intf/phys-[eth1/2]"]
    );
}

#[test]
fn test_subtree_json_is_sorted_and_stable() {
    let cache = seeded();
    let json = cache.subtree_json(&dn("sys/intf")).unwrap();
    assert_eq!(
        json,
        r#"{"sys/intf":{},"sys/intf/phys-[eth1/1]":{},"sys/intf/phys-[eth1/2]":{}}"#
    );
    assert_eq!(json, cache.subtree_json(&dn("sys/intf")).unwrap());
}

#[test]
fn test_subtree_of_missing_root_is_not_found() {
    let cache = seeded();
    let err = cache.subtree_json(&dn("sys/absent")).unwrap_err();
    assert_eq!(err.as_store(), Some(&StoreError::NotFound("sys/absent".into())));
}

#[test]
fn test_mo_json_renders_single_object() {
    let cache = ObjectCache::new();
    cache.insert_new(dn("sys/bgp"), None).unwrap();
    assert_eq!(cache.mo_json(&dn("sys/bgp")).unwrap(), r#"{"sys/bgp":{}}"#);
    assert!(cache.mo_json(&dn("sys")).is_err());
}
