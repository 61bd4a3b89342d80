// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn encodes_empty_table() {
    let table = PortTable::new();
    assert_eq!(encode_port_table(&table), "{}");
}

#[test]
fn encodes_sorted_entries() {
    let mut table = PortTable::new();
    table.insert("web".to_string(), 8080);
    table.insert("db".to_string(), 5432);
    table.insert("web:grpc".to_string(), 9090);

    let encoded = encode_port_table(&table);
    let parsed: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(parsed["web"], 8080);
    assert_eq!(parsed["db"], 5432);
    assert_eq!(parsed["web:grpc"], 9090);

    // Keys are sorted lexicographically in the raw output.
    assert!(encoded.find("\"db\"").unwrap() < encoded.find("\"web\"").unwrap());
}
