//! OS signal handling for graceful shutdown

use crate::prelude::*;

/// Wait for a termination signal (SIGINT/SIGTERM, or Ctrl+C off unix)
pub async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| Error::signal(format!("Failed to create SIGINT handler: {}", e)))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| Error::signal(format!("Failed to create SIGTERM handler: {}", e)))?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::signal(format!("Failed to listen for Ctrl+C: {}", e)))?;
        info!("Received Ctrl+C");
        Ok(())
    }
}

/// Resolve on the first termination signal.
///
/// If handlers cannot be installed the error is logged and the future never
/// resolves, so callers keep running under their other shutdown triggers.
pub async fn shutdown_requested() {
    if let Err(e) = wait_for_signal().await {
        error!("{}", e);
        std::future::pending::<()>().await;
    }
}
