// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The port table: allocated ports keyed by `label` or `label:port_name`,
//! shared read-only with every running service (spec.md §3, §4.1).

use std::collections::HashMap;

use crate::label::Label;

/// The qualified name used as a port-table key: `label` for a service's
/// unnamed/default port, `label:port_name` for a named port.
pub fn qualified_port_name(label: &Label, port_name: Option<&str>) -> String {
    match port_name {
        Some(name) => format!("{label}:{name}"),
        None => label.to_string(),
    }
}

/// Read-only snapshot of every port allocated so far, shared with every
/// service process via `${ports.<qualified-name>}` substitution and with
/// the control plane's `GET /v0/port` endpoint.
#[derive(Debug, Clone, Default)]
pub struct PortTable {
    ports: HashMap<String, u16>,
}

impl PortTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, qualified_name: String, port: u16) {
        self.ports.insert(qualified_name, port);
    }

    pub fn get(&self, qualified_name: &str) -> Option<u16> {
        self.ports.get(qualified_name).copied()
    }

    pub fn get_for(&self, label: &Label, port_name: Option<&str>) -> Option<u16> {
        self.get(&qualified_port_name(label, port_name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.ports.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
