// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Go-style duration string parsing with documented per-field fallbacks.
//!
//! The on-disk spec file is produced by a Go build-system integration
//! (out of scope for this crate) and writes durations as Go duration
//! strings (`"500ms"`, `"30s"`, `"2m"`). Invalid or missing strings fall
//! back to a default that depends on which field is being parsed.

use std::time::Duration;

/// Identifies which spec field a duration string came from, so an invalid
/// string can fall back to the right default and log a field-specific
/// warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationField {
    HealthCheckInterval,
    HealthCheckTimeout,
    ExpectedStartDuration,
    ShutdownTimeout,
}

impl DurationField {
    pub fn name(self) -> &'static str {
        match self {
            Self::HealthCheckInterval => "health_check_interval",
            Self::HealthCheckTimeout => "health_check_timeout",
            Self::ExpectedStartDuration => "expected_start_duration",
            Self::ShutdownTimeout => "shutdown_timeout",
        }
    }

    pub fn default_value(self) -> Duration {
        match self {
            Self::HealthCheckInterval => Duration::from_millis(200),
            Self::HealthCheckTimeout => Duration::from_secs(30),
            Self::ExpectedStartDuration => Duration::from_secs(5),
            Self::ShutdownTimeout => Duration::from_secs(10),
        }
    }
}

/// Parse a Go-style duration string (`"500ms"`, `"1.5s"`, `"2m"`, `"1h"`).
///
/// `None` or an unparseable string falls back to `field`'s documented
/// default, logging a warning that names the field and (if known) the
/// label it belongs to.
pub fn parse_duration(raw: Option<&str>, field: DurationField, label: &str) -> Duration {
    match raw {
        None => field.default_value(),
        Some(s) if s.is_empty() => field.default_value(),
        Some(s) => match parse_go_duration(s) {
            Some(d) => d,
            None => {
                tracing::warn!(
                    label,
                    field = field.name(),
                    value = s,
                    default_ms = field.default_value().as_millis() as u64,
                    "invalid duration string, falling back to default"
                );
                field.default_value()
            }
        },
    }
}

/// Parse a Go-style duration string into a `Duration`.
///
/// Supports a sequence of `<number><unit>` pairs (`"1h30m"`,
/// `"500ms"`), where unit is one of `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`.
/// A bare number with no unit is rejected (Go itself requires a unit).
fn parse_go_duration(s: &str) -> Option<Duration> {
    let mut rest = s.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut saw_any = false;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let (number_str, tail) = rest.split_at(digits_end);
        let number: f64 = number_str.parse().ok()?;

        let (unit, tail) = split_unit(tail)?;
        let unit_ns: f64 = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60_000_000_000.0,
            "h" => 3_600_000_000_000.0,
            _ => return None,
        };

        let nanos = number * unit_ns;
        if nanos < 0.0 || !nanos.is_finite() {
            return None;
        }
        total += Duration::from_nanos(nanos as u64);
        saw_any = true;
        rest = tail;
    }

    saw_any.then_some(total)
}

/// Split the longest valid unit prefix (`ns`/`us`/`µs`/`ms`/`s`/`m`/`h`) off `s`.
fn split_unit(s: &str) -> Option<(&str, &str)> {
    const UNITS: &[&str] = &["ns", "us", "µs", "ms", "s", "m", "h"];
    UNITS
        .iter()
        .filter(|u| s.starts_with(**u))
        .max_by_key(|u| u.len())
        .map(|u| s.split_at(u.len()))
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
