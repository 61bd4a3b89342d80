// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec augmentation: port allocation, color assignment, version-file
//! resolution, and placeholder substitution (spec.md §3, §4.1, §6).
//!
//! Resolving runfile-relative paths to real filesystem paths is the
//! out-of-scope build-system collaborator's job (spec.md §1); this module
//! treats `exe`/`health_check`/`version_file` as already-resolved paths.

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use svcinit_adapters::{allocate_ports, PortAlias, PortRequest, RetainedListener};
use svcinit_core::{assign_color, qualified_port_name, Label, PortTable, ServiceSpec, VersionedServiceSpec};
use svcinit_wire::{substitute_args, substitute_env};
use tokio::sync::mpsc;

use crate::error::DaemonError;
use crate::runner::ServiceCrash;

/// Paths and published values threaded through augmentation and spawn,
/// mirroring the "explicit Environment value" design note in spec.md §9
/// rather than scattering `std::env::var` lookups through the pipeline.
#[derive(Debug, Clone)]
pub struct Environment {
    pub socket_dir: PathBuf,
    pub tmpdir: PathBuf,
    pub test_tmpdir: PathBuf,
    pub svcctl_port: u16,
    pub get_assigned_port_bin: Option<PathBuf>,
}

impl Environment {
    /// Variables consumed by `$${...}` placeholder substitution, minus any
    /// per-service `PORT` entry (added by the caller per-spec).
    pub fn substitution_vars(&self, ports: &PortTable) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert(svcinit_wire::template::TMPDIR.to_string(), self.tmpdir.display().to_string());
        vars.insert(
            svcinit_wire::template::TEST_TMPDIR.to_string(),
            self.test_tmpdir.display().to_string(),
        );
        vars.insert(
            svcinit_wire::template::SOCKET_DIR.to_string(),
            self.socket_dir.display().to_string(),
        );
        for (name, port) in ports.iter() {
            vars.insert(name.to_string(), port.to_string());
        }
        vars
    }

    /// The environment variables exported to every spawned child
    /// (spec.md §6 "Environment outputs").
    pub fn child_env(&self, ports: &PortTable) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("SOCKET_DIR".to_string(), self.socket_dir.display().to_string());
        env.insert("TEST_TMPDIR".to_string(), self.test_tmpdir.display().to_string());
        env.insert("TMPDIR".to_string(), self.tmpdir.display().to_string());
        env.insert("ASSIGNED_PORTS".to_string(), svcinit_wire::encode_port_table(ports));
        env.insert("SVCCTL_PORT".to_string(), self.svcctl_port.to_string());
        if let Some(bin) = &self.get_assigned_port_bin {
            env.insert("GET_ASSIGNED_PORT_BIN".to_string(), bin.display().to_string());
        }
        env
    }
}

/// Result of augmenting a raw spec map: the versioned specs ready for the
/// coordinator, the port table, and any listeners retained for
/// `so_reuseport_aware` services.
pub struct Augmented {
    pub specs: IndexMap<Label, VersionedServiceSpec>,
    pub ports: PortTable,
    pub retained_listeners: Vec<RetainedListener>,
}

/// Perform spec augmentation (spec.md §3 "Versioned spec", §4.1): allocate
/// ports, assign colors, read version files, and substitute placeholders
/// in `args`/`env`/health-check fields.
pub fn augment_specs(raw: IndexMap<Label, ServiceSpec>, env: &Environment) -> Result<Augmented, DaemonError> {
    let mut requests = Vec::new();
    let mut aliases = Vec::new();
    for spec in raw.values() {
        for port_name in spec.ports_to_allocate() {
            requests.push(PortRequest {
                label: spec.label.clone(),
                port_name: port_name.map(str::to_string),
                so_reuseport_aware: spec.so_reuseport_aware,
            });
        }
        for (alias, source) in &spec.port_aliases {
            let port_name = if alias.is_empty() { None } else { Some(alias.as_str()) };
            aliases.push(PortAlias {
                alias: qualified_port_name(&spec.label, port_name),
                source: source.to_string(),
            });
        }
    }
    let (ports, retained_listeners) = allocate_ports(&requests, &aliases)?;

    let mut specs = IndexMap::with_capacity(raw.len());
    for (label, spec) in raw {
        let version = match &spec.version_file {
            Some(path) => Some(std::fs::read(path).map_err(|source| DaemonError::VersionFile {
                path: path.clone(),
                source,
            })?),
            None => None,
        };
        let color = assign_color(label.as_str());

        let mut vars = env.substitution_vars(&ports);
        if spec.autoassign_port {
            if let Some(port) = ports.get_for(&label, None) {
                vars.insert(svcinit_wire::template::PORT.to_string(), port.to_string());
            }
        }

        let args = substitute_args(&spec.args, &vars);
        let subst_env = substitute_env(&spec.env, &vars);
        let http_health_check_address =
            spec.http_health_check_address.as_ref().map(|a| svcinit_wire::substitute(a, &vars));
        let health_check_args = substitute_args(&spec.health_check_args, &vars);

        let resolved_exe = spec.exe.clone();
        let resolved_health_check = spec.health_check.as_ref().map(PathBuf::from);

        let versioned_spec = ServiceSpec {
            args,
            env: subst_env,
            http_health_check_address,
            health_check_args,
            ..spec
        };

        specs.insert(
            label,
            VersionedServiceSpec {
                spec: versioned_spec,
                resolved_exe,
                resolved_health_check,
                version,
                color,
            },
        );
    }

    Ok(Augmented { specs, ports, retained_listeners })
}

/// Forward each service crash from the reaper tasks' shared channel to
/// `sink` on a dedicated task, decoupling producers from whatever the
/// subscriber does with the notification.
pub fn spawn_runtime_event_forwarder(
    mut rx: mpsc::Receiver<ServiceCrash>,
    sink: mpsc::Sender<ServiceCrash>,
) {
    tokio::spawn(async move {
        while let Some(crash) = rx.recv().await {
            if sink.send(crash).await.is_err() {
                tracing::warn!("error sink closed; dropping service crash notification");
                break;
            }
        }
    });
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
