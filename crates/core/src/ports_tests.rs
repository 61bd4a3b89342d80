// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn unnamed_port_key_is_bare_label() {
    let label = Label::from("web");
    assert_eq!(qualified_port_name(&label, None), "web");
}

#[test]
fn named_port_key_uses_a_colon() {
    let label = Label::from("web");
    assert_eq!(qualified_port_name(&label, Some("grpc")), "web:grpc");
}

#[test]
fn insert_and_get_round_trip() {
    let mut table = PortTable::new();
    table.insert("web".to_string(), 8080);
    table.insert("web:grpc".to_string(), 9090);

    let label = Label::from("web");
    assert_eq!(table.get_for(&label, None), Some(8080));
    assert_eq!(table.get_for(&label, Some("grpc")), Some(9090));
    assert_eq!(table.get_for(&label, Some("missing")), None);
}

#[test]
fn len_and_is_empty() {
    let mut table = PortTable::new();
    assert!(table.is_empty());
    table.insert("a".to_string(), 1);
    assert_eq!(table.len(), 1);
    assert!(!table.is_empty());
}
