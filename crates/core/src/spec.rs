// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The service specification data model (spec.md §3).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::label::Label;

/// Whether a spec entry is a long-lived process, a run-to-completion
/// process, or a purely logical grouping node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Service,
    Task,
    Group,
}

/// Signal used to initiate shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShutdownSignal {
    Sigterm,
    Sigkill,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::Sigkill
    }
}

/// A readiness probe, modeled as a tagged variant rather than inferred
/// from which optional fields happen to be set (design note in spec.md §9).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Probe {
    Http {
        address: String,
    },
    Command {
        exe: String,
        args: Vec<String>,
    },
    #[default]
    None,
}

/// Immutable per-label spec entry, as read from the service spec JSON
/// file (spec.md §3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(rename = "type")]
    pub ty: ServiceType,
    pub label: Label,
    pub exe: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default)]
    pub deps: Vec<Label>,

    #[serde(default)]
    pub http_health_check_address: Option<String>,
    #[serde(default)]
    pub health_check: Option<String>,
    #[serde(default)]
    pub health_check_args: Vec<String>,
    #[serde(default)]
    pub health_check_label: Option<String>,
    #[serde(default)]
    pub health_check_interval: Option<String>,
    #[serde(default)]
    pub health_check_timeout: Option<String>,
    #[serde(default)]
    pub expected_start_duration: Option<String>,

    #[serde(default)]
    pub autoassign_port: bool,
    #[serde(default)]
    pub named_ports: Vec<String>,
    #[serde(default)]
    pub port_aliases: IndexMap<String, Label>,
    #[serde(default)]
    pub so_reuseport_aware: bool,

    #[serde(default)]
    pub hot_reloadable: bool,
    #[serde(default)]
    pub shutdown_signal: ShutdownSignal,
    #[serde(default)]
    pub shutdown_timeout: Option<String>,
    #[serde(default)]
    pub enforce_forceful_shutdown: bool,
    #[serde(default)]
    pub deferred: bool,

    #[serde(default)]
    pub version_file: Option<PathBuf>,
}

impl ServiceSpec {
    /// Build the tagged `Probe` for this spec, per the dynamic-dispatch
    /// design note in spec.md §9.
    pub fn probe(&self) -> Probe {
        if let Some(address) = &self.http_health_check_address {
            return Probe::Http {
                address: address.clone(),
            };
        }
        if let Some(exe) = &self.health_check {
            return Probe::Command {
                exe: exe.clone(),
                args: self.health_check_args.clone(),
            };
        }
        Probe::None
    }

    /// Ports this spec needs allocated: named ports, plus one unnamed
    /// entry if `autoassign_port` (spec.md §4.1 step 1).
    pub fn ports_to_allocate(&self) -> Vec<Option<&str>> {
        let mut ports: Vec<Option<&str>> = self.named_ports.iter().map(|n| Some(n.as_str())).collect();
        if self.autoassign_port {
            ports.push(None);
        }
        ports
    }

    /// Whether this spec differs from `other` only in `version_file`
    /// *contents* is a property of the resolved `VersionedServiceSpec`,
    /// not the raw spec — see [`VersionedServiceSpec::differs_only_in_version`].
    pub fn structurally_eq_ignoring_version(&self, other: &ServiceSpec) -> bool {
        self.ty == other.ty
            && self.label == other.label
            && self.exe == other.exe
            && self.args == other.args
            && self.env == other.env
            && self.deps == other.deps
            && self.http_health_check_address == other.http_health_check_address
            && self.health_check == other.health_check
            && self.health_check_args == other.health_check_args
            && self.health_check_label == other.health_check_label
            && self.health_check_interval == other.health_check_interval
            && self.health_check_timeout == other.health_check_timeout
            && self.expected_start_duration == other.expected_start_duration
            && self.autoassign_port == other.autoassign_port
            && self.named_ports == other.named_ports
            && self.port_aliases == other.port_aliases
            && self.so_reuseport_aware == other.so_reuseport_aware
            && self.hot_reloadable == other.hot_reloadable
            && self.shutdown_signal == other.shutdown_signal
            && self.shutdown_timeout == other.shutdown_timeout
            && self.enforce_forceful_shutdown == other.enforce_forceful_shutdown
            && self.deferred == other.deferred
        // version_file path may legitimately change between snapshots of
        // the same logical service (e.g. a differently-resolved runfile
        // path); what matters for equality is the resolved version bytes,
        // compared at the VersionedServiceSpec level.
    }
}

/// A spec plus everything resolved during spec augmentation (spec.md §3
/// "Versioned spec").
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedServiceSpec {
    pub spec: ServiceSpec,
    pub resolved_exe: PathBuf,
    pub resolved_health_check: Option<PathBuf>,
    pub version: Option<Vec<u8>>,
    pub color: u8,
}

impl VersionedServiceSpec {
    pub fn label(&self) -> &Label {
        &self.spec.label
    }

    /// True when `self` and `other` are the same spec except for the
    /// resolved `version` bytes, and both are `hot_reloadable` — the
    /// precise "reload" predicate from spec.md §3's reconciliation diff.
    pub fn differs_only_in_version(&self, other: &VersionedServiceSpec) -> bool {
        self.spec.structurally_eq_ignoring_version(&other.spec) && self.version != other.version
    }

    /// True when every field (including resolved version) matches.
    pub fn is_identical(&self, other: &VersionedServiceSpec) -> bool {
        self.spec.structurally_eq_ignoring_version(&other.spec) && self.version == other.version
    }
}

#[cfg(any(test, feature = "test-support"))]
mod test_support {
    use super::*;

    crate::builder! {
        pub struct ServiceSpecBuilder => ServiceSpec {
            set { ty: ServiceType = ServiceType::Service }
            into { label: Label = "svc" }
            set { exe: PathBuf = PathBuf::from("/bin/true") }
            set { args: Vec<String> = Vec::new() }
            set { env: IndexMap<String, String> = IndexMap::new() }
            set { deps: Vec<Label> = Vec::new() }
            option { http_health_check_address: String = None }
            option { health_check: String = None }
            set { health_check_args: Vec<String> = Vec::new() }
            option { health_check_label: String = None }
            option { health_check_interval: String = None }
            option { health_check_timeout: String = None }
            option { expected_start_duration: String = None }
            set { autoassign_port: bool = false }
            set { named_ports: Vec<String> = Vec::new() }
            set { port_aliases: IndexMap<String, Label> = IndexMap::new() }
            set { so_reuseport_aware: bool = false }
            set { hot_reloadable: bool = false }
            set { shutdown_signal: ShutdownSignal = ShutdownSignal::Sigkill }
            option { shutdown_timeout: String = None }
            set { enforce_forceful_shutdown: bool = false }
            set { deferred: bool = false }
            option { version_file: PathBuf = None }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use test_support::ServiceSpecBuilder;

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
