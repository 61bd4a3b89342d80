// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON encoding of the port table, published to children via the
//! `ASSIGNED_PORTS` environment variable and served from `GET /v0/port`.

use std::collections::BTreeMap;

use svcinit_core::PortTable;

/// Encode a port table as a JSON object mapping qualified port name to
/// port number, sorted by key for a stable, diffable representation.
pub fn encode_port_table(table: &PortTable) -> String {
    let sorted: BTreeMap<&str, u16> = table.iter().collect();
    serde_json::to_string(&sorted).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
#[path = "ports_wire_tests.rs"]
mod tests;
