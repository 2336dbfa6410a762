use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::cursor::PropertyCursor;

fn props() -> BTreeMap<String, String> {
    [("mtu", "1500"), ("admin_state", "up"), ("descr", "uplink")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_entries_come_back_in_name_order() {
    let map = props();
    let mut cursor = PropertyCursor::new();
    let mut names = Vec::new();
    let mut first = true;
    while let Some((k, _)) = cursor.next_entry(first, &map) {
        names.push(k.clone());
        first = false;
    }
    assert_eq!(names, vec!["admin_state", "descr", "mtu"]);
}

#[test]
fn test_end_is_sticky_until_restart() {
    let map = props();
    let mut cursor = PropertyCursor::new();
    for _ in 0..3 {
        assert!(cursor.next_entry(false, &map).is_some());
    }
    assert!(cursor.next_entry(false, &map).is_none());
    assert!(cursor.next_entry(false, &map).is_none());

    let (k, v) = cursor.next_entry(true, &map).unwrap();
    assert_eq!((k.as_str(), v.as_str()), ("admin_state", "up"));
}

#[test]
fn test_cursor_survives_reload_with_new_keys() {
    let mut map = props();
    let mut cursor = PropertyCursor::new();
    assert_eq!(cursor.next_entry(true, &map).unwrap().0, "admin_state");

    map.insert("bandwidth".to_string(), "10G".to_string());
    assert_eq!(cursor.next_entry(false, &map).unwrap().0, "bandwidth");
    assert_eq!(cursor.next_entry(false, &map).unwrap().0, "descr");
}

#[test]
fn test_empty_set_yields_none() {
    let set = BTreeSet::new();
    let mut cursor = PropertyCursor::new();
    assert!(cursor.next_name(true, &set).is_none());
    assert!(cursor.next_name(false, &set).is_none());
}

#[test]
fn test_names_restart_reproduces_sequence() {
    let set: BTreeSet<String> = ["b", "a", "c"].iter().map(|s| s.to_string()).collect();
    let mut cursor = PropertyCursor::new();

    let mut first_pass = Vec::new();
    let mut first = true;
    while let Some(name) = cursor.next_name(first, &set) {
        first_pass.push(name.clone());
        first = false;
    }
    let mut second_pass = Vec::new();
    let mut first = true;
    while let Some(name) = cursor.next_name(first, &set) {
        second_pass.push(name.clone());
        first = false;
    }
    assert_eq!(first_pass, vec!["a", "b", "c"]);
    assert_eq!(first_pass, second_pass);
}
