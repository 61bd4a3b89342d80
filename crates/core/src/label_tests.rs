// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn displays_as_inner_string() {
    let label = Label::from("web");
    assert_eq!(label.to_string(), "web");
    assert_eq!(label.as_str(), "web");
}

#[test]
fn usable_as_hashmap_key_by_str() {
    let mut map: HashMap<Label, u32> = HashMap::new();
    map.insert(Label::from("web"), 1);
    assert_eq!(map.get("web"), Some(&1));
}

#[test]
fn equal_labels_from_different_sources() {
    assert_eq!(Label::from("a"), Label::from("a".to_string()));
}
