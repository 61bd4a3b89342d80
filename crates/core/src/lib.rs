// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! svcinit-core: data model for the hermetic multi-service supervisor.
//!
//! This crate has no process, socket, or filesystem side effects — it
//! defines the specification types (`ServiceSpec`, `Probe`, `PortTable`,
//! ...) shared by every other crate in the workspace, plus the pure
//! functions that operate on them (duration parsing, placeholder
//! substitution helpers, color assignment, reconciliation diffing).

pub mod color;
pub mod diff;
pub mod duration;
pub mod label;
pub mod macros;
pub mod ports;
pub mod spec;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use color::{assign_color, colorize};
pub use diff::{reconcile, ReconcileDiff};
pub use duration::{parse_duration, DurationField};
pub use label::Label;
pub use ports::{qualified_port_name, PortTable};
pub use spec::{Probe, ServiceSpec, ServiceType, ShutdownSignal, VersionedServiceSpec};

#[cfg(any(test, feature = "test-support"))]
pub use spec::ServiceSpecBuilder;
