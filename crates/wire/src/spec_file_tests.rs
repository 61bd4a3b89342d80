// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn decodes_minimal_service() {
    let json = r#"{
        "web": { "type": "service", "label": "web", "exe": "/bin/web" }
    }"#;

    let specs = decode_spec_file("test.json", json).unwrap();
    let web = specs.get(&Label::from("web")).unwrap();
    assert_eq!(web.exe.to_str().unwrap(), "/bin/web");
    assert!(web.args.is_empty());
    assert!(!web.autoassign_port);
}

#[test]
fn decodes_full_service_with_probe_and_ports() {
    let json = r#"{
        "web": {
            "type": "service",
            "label": "web",
            "exe": "/bin/web",
            "args": ["--port", "$${PORT}"],
            "deps": ["db"],
            "autoassign_port": true,
            "named_ports": ["grpc"],
            "http_health_check_address": "$${PORT}/healthz",
            "hot_reloadable": true,
            "expected_start_duration": "2s"
        },
        "db": { "type": "service", "label": "db", "exe": "/bin/db" }
    }"#;

    let specs = decode_spec_file("test.json", json).unwrap();
    assert_eq!(specs.len(), 2);
    let web = &specs[&Label::from("web")];
    assert_eq!(web.deps, vec![Label::from("db")]);
    assert_eq!(web.named_ports, vec!["grpc".to_string()]);
    assert!(web.autoassign_port);
    assert!(web.hot_reloadable);
    assert_eq!(web.expected_start_duration.as_deref(), Some("2s"));
}

#[test]
fn preserves_file_order() {
    let json = r#"{
        "z": { "type": "task", "label": "z", "exe": "/bin/z" },
        "a": { "type": "task", "label": "a", "exe": "/bin/a" }
    }"#;

    let specs = decode_spec_file("test.json", json).unwrap();
    let labels: Vec<&str> = specs.keys().map(|l| l.as_str()).collect();
    assert_eq!(labels, vec!["z", "a"]);
}

#[test]
fn rejects_key_label_mismatch() {
    let json = r#"{
        "web": { "type": "service", "label": "other", "exe": "/bin/web" }
    }"#;

    let err = decode_spec_file("test.json", json).unwrap_err();
    assert!(matches!(err, WireError::LabelMismatch { .. }));
}

#[test]
fn rejects_malformed_json() {
    let err = decode_spec_file("test.json", "not json").unwrap_err();
    assert!(matches!(err, WireError::Parse { .. }));
}

#[test]
fn group_type_decodes_without_exe_requirement_relaxation() {
    // Groups still require an exe field on the wire today; callers that
    // want a true no-op group spec use a harmless placeholder exe.
    let json = r#"{
        "all": { "type": "group", "label": "all", "exe": "/bin/true" }
    }"#;
    let specs = decode_spec_file("test.json", json).unwrap();
    assert_eq!(specs[&Label::from("all")].ty, svcinit_core::ServiceType::Group);
}
