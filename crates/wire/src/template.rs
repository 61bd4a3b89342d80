// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `$${...}` placeholder substitution in `args`, `env` values, and probe
//! addresses, performed once per service instance before spawn.
//!
//! The double-dollar form (rather than a single `${...}`) matches the
//! on-disk spec format produced by the build-system integration, which
//! itself reserves single-`$` Make-variable syntax for its own expansion
//! pass upstream of this one.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$\{([^}]+)\}").expect("constant regex pattern is valid"));

/// Well-known placeholder names resolved outside the port table.
pub const PORT: &str = "PORT";
pub const TMPDIR: &str = "TMPDIR";
pub const TEST_TMPDIR: &str = "TEST_TMPDIR";
pub const SOCKET_DIR: &str = "SOCKET_DIR";

/// Substitute every `$${name}` occurrence in `template` using `vars`.
///
/// `vars` should already contain entries for `PORT` (only meaningful for
/// `autoassign_port` services), `TMPDIR`, `TEST_TMPDIR`, `SOCKET_DIR`, and
/// every qualified port-table name the caller wants addressable. A
/// placeholder with no matching entry is left verbatim in the output
/// rather than erroring, so a spec file can reference a not-yet-resolved
/// name without failing the whole run.
pub fn substitute(template: &str, vars: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            match vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

/// Apply [`substitute`] across every element of an arg list.
pub fn substitute_args(args: &[String], vars: &HashMap<String, String>) -> Vec<String> {
    args.iter().map(|a| substitute(a, vars)).collect()
}

/// Apply [`substitute`] across every value of an env map, leaving keys untouched.
pub fn substitute_env(
    env: &indexmap::IndexMap<String, String>,
    vars: &HashMap<String, String>,
) -> indexmap::IndexMap<String, String> {
    env.iter().map(|(k, v)| (k.clone(), substitute(v, vars))).collect()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
