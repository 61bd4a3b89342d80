// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `svcinit`: the hermetic multi-service supervisor binary. Loads a
//! service-spec file, brings every instance up in dependency order, runs
//! an optional wrapped test binary against them, and tears down
//! deterministically (spec.md §1, §2).

mod args;
mod report;
mod run;
mod signals;

use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let default_level = if svcinit_daemon::env::terse_output() { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

fn main() -> anyhow::Result<()> {
    let raw_argv: Vec<String> = std::env::args().skip(1).collect();
    let (flags, test_args) = args::parse_flags(&raw_argv)?;

    init_tracing();

    let runtime = tokio::runtime::Runtime::new()?;
    let exit_code = runtime.block_on(run::run(flags, test_args))?;
    std::process::exit(exit_code);
}
