// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! svcinit-adapters: the seam between service lifecycle logic and the OS.
//!
//! Port pre-allocation, process spawn/signal/wait, readiness probing, and
//! color-prefixed log teeing. Every side-effecting concern exposes a trait
//! with a real implementation and (behind `test-support`) a fake, so
//! `svcinit-engine` can be driven deterministically in tests.

pub mod log_writer;
pub mod ports;
pub mod probe;
pub mod process;

pub use log_writer::LogWriter;
pub use ports::{allocate_ports, PortAlias, PortAllocationError, PortRequest, RetainedListener};
pub use probe::{ProbeClient, RealProbeClient};
pub use process::{
    ChildOutput, ProcessAdapter, ProcessError, ProcessSignal, RealProcessAdapter, SpawnSpec, SpawnedProcess,
};

#[cfg(any(test, feature = "test-support"))]
pub use probe::FakeProbeClient;

#[cfg(any(test, feature = "test-support"))]
pub use process::{FakeProcessAdapter, FakeProcessHandle, FakeSpawnedProcess, SpawnCall};
