// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line surface (spec.md §6, SPEC_FULL.md §6 "Raw test-arg
//! splitting").
//!
//! `svcinit` is invoked with its own flags followed by the argv of the
//! test binary it wraps. The build-system integration that assembles
//! those two halves is out of scope (spec.md §1), but this binary still
//! has to split the combined argv it receives back apart: everything
//! after a bare `--` is the test binary's; before that, anything that
//! isn't one of `svcinit`'s own recognized flags is assumed to be the
//! test binary's too.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "svcinit")]
pub struct Flags {
    /// File defining which services to run, overriding
    /// `SVCINIT_SERVICE_SPECS_RLOCATION_PATH`.
    #[arg(long = "svc.definitions-path")]
    pub definitions_path: Option<String>,
}

/// Split a combined argv (not including argv[0]) into `svcinit`'s own
/// flags and the wrapped test binary's argv.
///
/// Only `--flag=value` and bare `--flag` forms are recognized as
/// `svcinit`'s own — `--flag value` is not, since there's no reliable way
/// to tell a flag's value apart from the start of the test binary's own
/// args (mirrors the original's documented limitation).
pub fn split_argv(argv: &[String]) -> (Vec<String>, Vec<String>) {
    let recognized = ["svc.definitions-path", "help", "h"];
    let mut svcinit_args = Vec::new();
    let mut test_args = Vec::new();

    for (i, arg) in argv.iter().enumerate() {
        if arg == "--" {
            test_args.extend_from_slice(&argv[i + 1..]);
            break;
        }
        if !arg.starts_with('-') {
            test_args.push(arg.clone());
            continue;
        }
        let flag_name = arg.trim_start_matches('-').split('=').next().unwrap_or("");
        if recognized.contains(&flag_name) {
            svcinit_args.push(arg.clone());
        } else {
            test_args.push(arg.clone());
        }
    }

    (svcinit_args, test_args)
}

pub fn parse_flags(raw_argv: &[String]) -> anyhow::Result<(Flags, Vec<String>)> {
    let (svcinit_args, test_args) = split_argv(raw_argv);
    let mut full = vec!["svcinit".to_string()];
    full.extend(svcinit_args);
    let flags = Flags::try_parse_from(full)?;
    Ok((flags, test_args))
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
