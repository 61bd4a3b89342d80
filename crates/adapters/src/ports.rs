// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ephemeral TCP port pre-allocation (spec.md §4.1).
//!
//! Binds a transient listener on `127.0.0.1:0` per port requested, reads
//! back the OS-assigned port, then either closes the listener (the common
//! case) or retains it for a `so_reuseport_aware` service that will bind
//! the same port again under `SO_REUSEPORT` once spawned.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::time::Duration;

use socket2::{Domain, Socket, Type};
use svcinit_core::{qualified_port_name, Label, PortTable};
use thiserror::Error;

/// One port request: a label, an optional port name (`None` = unnamed
/// default port), and whether the listener should be retained for the
/// service to reuse under `SO_REUSEPORT`.
#[derive(Debug, Clone)]
pub struct PortRequest {
    pub label: Label,
    pub port_name: Option<String>,
    pub so_reuseport_aware: bool,
}

/// A port alias: bind `alias` to the same port already recorded under
/// `source`.
#[derive(Debug, Clone)]
pub struct PortAlias {
    pub alias: String,
    pub source: String,
}

#[derive(Debug, Error)]
pub enum PortAllocationError {
    #[error("failed to allocate a socket: {0}")]
    Socket(#[source] std::io::Error),
    #[error("failed to bind 127.0.0.1:0: {0}")]
    Bind(#[source] std::io::Error),
    #[error("failed to read bound local address: {0}")]
    LocalAddr(#[source] std::io::Error),
    #[error("port alias {alias:?} references unknown qualified name {source:?}")]
    UnresolvedAlias { alias: String, source: String },
}

/// A listener retained for a `so_reuseport_aware` service, keyed by its
/// qualified port name.
pub struct RetainedListener {
    pub qualified_name: String,
    pub listener: StdTcpListener,
}

/// How long to sleep after closing every non-retained listener, working
/// around ports occasionally being unready immediately after close despite
/// `SO_LINGER=0` (spec.md §4.1 step 5).
const KERNEL_SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Allocate one ephemeral port per request, resolve aliases, and return
/// the resulting table plus any retained listeners.
///
/// Synchronous and blocking-socket-based by design: allocation happens
/// once, up front, before any child is spawned, so there is no benefit to
/// async I/O here and every call site can treat it as a cheap setup step.
pub fn allocate_ports(
    requests: &[PortRequest],
    aliases: &[PortAlias],
) -> Result<(PortTable, Vec<RetainedListener>), PortAllocationError> {
    let mut table = PortTable::new();
    let mut retained = Vec::new();

    for request in requests {
        let qualified_name = qualified_port_name(&request.label, request.port_name.as_deref());
        let socket = bind_ephemeral(request.so_reuseport_aware)?;
        let local_addr: SocketAddr = socket.local_addr()?.as_socket().ok_or_else(|| {
            PortAllocationError::LocalAddr(std::io::Error::other("bound address was not IPv4/IPv6"))
        })?;
        table.insert(qualified_name.clone(), local_addr.port());

        if request.so_reuseport_aware {
            retained.push(RetainedListener {
                qualified_name,
                listener: socket.into(),
            });
        }
        // Non-retained sockets drop (and close) here.
    }

    std::thread::sleep(KERNEL_SETTLE_DELAY);

    for alias in aliases {
        let port = table.get(&alias.source).ok_or_else(|| PortAllocationError::UnresolvedAlias {
            alias: alias.alias.clone(),
            source: alias.source.clone(),
        })?;
        table.insert(alias.alias.clone(), port);
    }

    Ok((table, retained))
}

fn bind_ephemeral(so_reuseport_aware: bool) -> Result<Socket, PortAllocationError> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None).map_err(PortAllocationError::Socket)?;
    socket.set_linger(Some(Duration::ZERO)).map_err(PortAllocationError::Socket)?;
    if so_reuseport_aware {
        // Best-effort: unsupported platforms (e.g. some BSD variants) may
        // reject this; allocation still succeeds without REUSEPORT.
        let _ = socket.set_reuse_port(true);
    }
    let addr: SocketAddr = "127.0.0.1:0".parse().map_err(|_| {
        PortAllocationError::Bind(std::io::Error::other("invalid bind address constant"))
    })?;
    socket.bind(&addr.into()).map_err(PortAllocationError::Bind)?;
    socket.listen(1).map_err(PortAllocationError::Bind)?;
    Ok(socket)
}

impl From<std::io::Error> for PortAllocationError {
    fn from(source: std::io::Error) -> Self {
        PortAllocationError::LocalAddr(source)
    }
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
