// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP fixture used by the workspace's end-to-end specs.
//!
//! `fixture_svc serve ...` binds a port and serves 200 (or 204) on every
//! path, optionally sleeping before binding or exiting non-zero after a
//! delay. Mirrors the upstream system's own Go test fixture
//! (`tests/go_service/main.go`) closely enough to exercise the same
//! scenarios without a second toolchain. Installs no signal handler, so
//! SIGTERM/SIGINT terminate it immediately, exercising the
//! unhandled-SIGTERM shutdown-escalation path on purpose.
//!
//! `fixture_svc probe --label <L>` plays the part of the wrapped test
//! binary in one-shot specs (`tests/go_service/client/client_test.go`'s
//! role upstream): it reads the `ASSIGNED_PORTS` JSON the supervisor
//! exports, looks up `L`'s port, and exits 0 only if a GET against it
//! returns 200 or 204.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

struct ServeArgs {
    port: u16,
    sleep_before_bind_ms: u64,
    die_after_ms: Option<u64>,
    health_status: u16,
    file_to_open: Option<String>,
    pid_file: Option<String>,
}

fn parse_serve_args(raw: std::env::Args) -> ServeArgs {
    let mut port = None;
    let mut sleep_before_bind_ms = 0;
    let mut die_after_ms = None;
    let mut health_status = 200;
    let mut file_to_open = None;
    let mut pid_file = None;

    let mut raw = raw;
    while let Some(arg) = raw.next() {
        let Some(value) = raw.next() else { break };
        match arg.as_str() {
            "--port" => port = value.parse().ok(),
            "--sleep-before-bind-ms" => sleep_before_bind_ms = value.parse().unwrap_or(0),
            "--die-after-ms" => die_after_ms = value.parse().ok(),
            "--health-status" => health_status = value.parse().unwrap_or(200),
            "--file-to-open" => file_to_open = Some(value),
            "--pid-file" => pid_file = Some(value),
            _ => {}
        }
    }

    ServeArgs {
        port: port.unwrap_or(0),
        sleep_before_bind_ms,
        die_after_ms,
        health_status,
        file_to_open,
        pid_file,
    }
}

fn handle(mut stream: TcpStream, status: u16) {
    let mut buf = [0u8; 1024];
    let _ = stream.read(&mut buf);
    let reason = if status == 204 { "No Content" } else { "OK" };
    let body = if status == 204 { "" } else { "OK" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
}

fn serve(raw: std::env::Args) -> std::process::ExitCode {
    let args = parse_serve_args(raw);

    if let Some(path) = &args.file_to_open {
        if let Err(error) = std::fs::File::open(path) {
            eprintln!("serve: opening {path}: {error}");
            return std::process::ExitCode::FAILURE;
        }
    }

    if args.sleep_before_bind_ms > 0 {
        std::thread::sleep(Duration::from_millis(args.sleep_before_bind_ms));
    }

    let listener = match TcpListener::bind(("127.0.0.1", args.port)) {
        Ok(listener) => listener,
        Err(error) => {
            eprintln!("serve: binding 127.0.0.1:{}: {error}", args.port);
            return std::process::ExitCode::FAILURE;
        }
    };

    if let Some(path) = &args.pid_file {
        if let Err(error) = std::fs::write(path, std::process::id().to_string()) {
            eprintln!("serve: writing pid file {path}: {error}");
            return std::process::ExitCode::FAILURE;
        }
    }

    if let Some(delay) = args.die_after_ms {
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(delay));
            std::process::exit(7);
        });
    }

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => handle(stream, args.health_status),
            Err(_) => continue,
        }
    }
    std::process::ExitCode::SUCCESS
}

fn probe(raw: std::env::Args) -> std::process::ExitCode {
    let mut label = None;
    let mut raw = raw;
    while let Some(arg) = raw.next() {
        let Some(value) = raw.next() else { break };
        if arg == "--label" {
            label = Some(value);
        }
    }
    let Some(label) = label else {
        eprintln!("probe: --label is required");
        return std::process::ExitCode::FAILURE;
    };

    let raw_ports = std::env::var("ASSIGNED_PORTS").unwrap_or_default();
    let parsed: serde_json::Value = match serde_json::from_str(&raw_ports) {
        Ok(value) => value,
        Err(error) => {
            eprintln!("probe: parsing ASSIGNED_PORTS: {error}");
            return std::process::ExitCode::FAILURE;
        }
    };
    let Some(port) = parsed.get(&label).and_then(|v| v.as_u64()) else {
        eprintln!("probe: no port for label {label:?} in ASSIGNED_PORTS={raw_ports}");
        return std::process::ExitCode::FAILURE;
    };

    let mut stream = match TcpStream::connect(("127.0.0.1", port as u16)) {
        Ok(stream) => stream,
        Err(error) => {
            eprintln!("probe: connecting to {label} on port {port}: {error}");
            return std::process::ExitCode::FAILURE;
        }
    };
    let _ = stream.write_all(b"GET / HTTP/1.0\r\n\r\n");
    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    if response.contains(" 200 ") || response.contains(" 204 ") {
        std::process::ExitCode::SUCCESS
    } else {
        eprintln!("probe: unexpected response from {label}: {response}");
        std::process::ExitCode::FAILURE
    }
}

fn main() -> std::process::ExitCode {
    let mut args = std::env::args();
    args.next();
    match args.next().as_deref() {
        Some("serve") => serve(args),
        Some("probe") => probe(args),
        other => {
            eprintln!("usage: fixture_svc <serve|probe> [flags]; got {other:?}");
            std::process::ExitCode::FAILURE
        }
    }
}
