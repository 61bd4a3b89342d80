// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    millis        = { "500ms", Duration::from_millis(500) },
    seconds       = { "30s", Duration::from_secs(30) },
    minutes       = { "2m", Duration::from_secs(120) },
    hours         = { "1h", Duration::from_secs(3600) },
    compound      = { "1h30m", Duration::from_secs(5400) },
    fractional    = { "1.5s", Duration::from_millis(1500) },
    microseconds  = { "250us", Duration::from_micros(250) },
    nanoseconds   = { "10ns", Duration::from_nanos(10) },
)]
fn parses_valid_go_duration_strings(raw: &str, expected: Duration) {
    let parsed = parse_duration(Some(raw), DurationField::ShutdownTimeout, "svc");
    assert_eq!(parsed, expected);
}

#[yare::parameterized(
    missing_unit  = { "500" },
    empty         = { "" },
    garbage       = { "not-a-duration" },
    unknown_unit  = { "5days" },
)]
fn falls_back_to_field_default_on_invalid_input(raw: &str) {
    let parsed = parse_duration(Some(raw), DurationField::HealthCheckInterval, "svc");
    assert_eq!(parsed, DurationField::HealthCheckInterval.default_value());
}

#[test]
fn none_falls_back_to_default() {
    let parsed = parse_duration(None, DurationField::ExpectedStartDuration, "svc");
    assert_eq!(parsed, DurationField::ExpectedStartDuration.default_value());
}

#[test]
fn each_field_has_its_documented_default() {
    assert_eq!(
        DurationField::HealthCheckInterval.default_value(),
        Duration::from_millis(200)
    );
    assert_eq!(
        DurationField::HealthCheckTimeout.default_value(),
        Duration::from_secs(30)
    );
    assert_eq!(
        DurationField::ExpectedStartDuration.default_value(),
        Duration::from_secs(5)
    );
    assert_eq!(
        DurationField::ShutdownTimeout.default_value(),
        Duration::from_secs(10)
    );
}
