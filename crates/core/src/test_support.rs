// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::path::PathBuf;

use crate::label::Label;
use crate::spec::{ServiceSpec, ServiceSpecBuilder, VersionedServiceSpec};

/// Wrap a freshly-built spec in a [`VersionedServiceSpec`] with no
/// resolved version bytes and color 0, the shape most tests want.
pub fn versioned(spec: ServiceSpec) -> VersionedServiceSpec {
    VersionedServiceSpec {
        resolved_exe: spec.exe.clone(),
        resolved_health_check: None,
        color: 0,
        version: None,
        spec,
    }
}

/// A minimal named service with no deps, ports, or probe.
pub fn bare_service(label: &str) -> ServiceSpec {
    ServiceSpecBuilder::default()
        .label(label)
        .exe(PathBuf::from("/bin/true"))
        .build()
}

/// A service that depends on every label in `deps`.
pub fn service_with_deps(label: &str, deps: &[&str]) -> ServiceSpec {
    ServiceSpecBuilder::default()
        .label(label)
        .deps(deps.iter().map(|d| Label::from(*d)).collect())
        .build()
}

/// Proptest strategies for core data model types.
#[cfg(any(test, feature = "test-support"))]
pub mod strategies {
    use proptest::prelude::*;

    use crate::label::Label;

    /// Labels drawn from a small alphabet, matching the identifier shape
    /// a real spec file uses (`[a-z][a-z0-9_-]*`).
    pub fn arb_label() -> impl Strategy<Value = Label> {
        "[a-z][a-z0-9_-]{0,15}".prop_map(Label::from)
    }

    pub fn arb_labels(max_len: usize) -> impl Strategy<Value = Vec<Label>> {
        proptest::collection::vec(arb_label(), 0..max_len)
    }
}
