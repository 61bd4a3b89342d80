// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! svcinit-wire: on-disk/on-wire encodings.
//!
//! JSON decoding of the service-spec file, JSON encoding of the port
//! table published to children, and `$${...}` placeholder substitution
//! in `args`/`env`/probe addresses before spawn.

pub mod ports_wire;
pub mod spec_file;
pub mod template;

pub use ports_wire::encode_port_table;
pub use spec_file::{decode_spec_file, read_spec_file, WireError};
pub use template::{substitute, substitute_args, substitute_env};
