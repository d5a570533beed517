//! Port allocation for the streaming listener.
//!
//! Probing is a transient bind-and-release with address reuse enabled, the
//! same conditions the real listener binds under. Ports are always tried in
//! ascending order from the preferred one.

use std::net::{SocketAddr, ToSocketAddrs};

use tokio::net::TcpSocket;

use gdbs_core::prelude::*;

/// Default number of ports probed, preferred port included
pub const DEFAULT_MAX_ATTEMPTS: u16 = 10;

/// Resolve `host:port` to the first socket address
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::bind(format!("{host}:{port}"), "host did not resolve"))
}

/// Create a reuse-address socket bound to `addr` (not yet listening)
pub(crate) fn bind_socket(addr: SocketAddr) -> std::io::Result<TcpSocket> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    Ok(socket)
}

/// Check whether `host:port` can be bound right now.
///
/// Any failure (unresolvable host, permission, address in use) yields `false`.
pub fn is_bindable(host: &str, port: u16) -> bool {
    match resolve(host, port).and_then(|addr| bind_socket(addr).map_err(Error::from)) {
        Ok(_socket) => true,
        Err(e) => {
            trace!("Port {} on {} not bindable: {}", port, host, e);
            false
        }
    }
}

/// Find the first bindable port in `start..start + max_attempts`.
///
/// The range is clipped at `u16::MAX`.
pub fn find_available(host: &str, start: u16, max_attempts: u16) -> Result<u16> {
    (0..max_attempts)
        .map_while(|offset| start.checked_add(offset))
        .find(|&port| is_bindable(host, port))
        .ok_or_else(|| Error::PortExhausted {
            host: host.to_string(),
            start,
            attempts: max_attempts,
        })
}

/// Use `preferred` when free, otherwise fall back to the next free port.
pub fn allocate(host: &str, preferred: u16, max_attempts: u16) -> Result<u16> {
    if is_bindable(host, preferred) {
        return Ok(preferred);
    }

    warn!(
        "Port {} is already in use. Trying to find an available port...",
        preferred
    );
    let port = find_available(host, preferred, max_attempts)?;
    info!("Using port {} instead of {}", port, preferred);
    Ok(port)
}
