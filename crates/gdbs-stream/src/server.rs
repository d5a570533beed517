//! Streaming process lifecycle: allocate a port, bind, publish, serve, clean up.

use std::future::Future;
use std::path::PathBuf;

use tokio::io::AsyncReadExt;

use gdbs_core::prelude::*;
use gdbs_core::HandshakeStore;

use crate::gateway::Gateway;
use crate::port;
use crate::tail::TailOptions;

/// Everything the streaming process needs to run
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub host: String,
    /// Preferred port; the next free one is used when it is taken
    pub port: u16,
    pub max_port_attempts: u16,
    pub tail: TailOptions,
    pub handshake_path: PathBuf,
}

/// Run the streaming server until `shutdown` resolves.
///
/// Port exhaustion and bind failures are returned before anything is
/// published. A failed handshake write is only logged: readers fall back to
/// the configured port.
pub async fn run(config: StreamConfig, shutdown: impl Future<Output = ()>) -> Result<()> {
    let port = port::allocate(&config.host, config.port, config.max_port_attempts)?;
    let addr = port::resolve(&config.host, port)?;

    let tail_path = config.tail.path.clone();
    let gateway = Gateway::bind(addr, config.tail)?;
    let port = gateway.local_addr()?.port();

    let handshake = HandshakeStore::new(&config.handshake_path, config.port);
    if let Err(e) = handshake.publish(port) {
        warn!("Could not write port file {}: {}", handshake.path().display(), e);
    }

    info!("Starting WebSocket server on ws://{}:{}", config.host, port);
    info!("HTTP health check: http://{}:{}", config.host, port);
    info!("Tailing file: {}", tail_path.display());
    debug!("Advertising {}", gateway.advertised_url());

    let result = gateway.serve(shutdown).await;

    if let Err(e) = handshake.clear() {
        warn!("Could not remove port file {}: {}", handshake.path().display(), e);
    }
    info!("WebSocket server stopped");
    result
}

/// Resolve once stdin reaches end-of-file.
///
/// A supervising parent signals graceful shutdown by closing the pipe.
pub async fn stdin_closed() {
    let mut stdin = tokio::io::stdin();
    let mut buf = [0u8; 256];
    loop {
        match stdin.read(&mut buf).await {
            Ok(0) => {
                debug!("stdin closed");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("stdin read failed: {}", e);
                return;
            }
        }
    }
}
