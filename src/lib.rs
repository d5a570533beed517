//! gdb-streamer
//!
//! Entry points for the two processes behind the `gdbs` binary: the stdio
//! control channel (which supervises the streaming process) and the
//! streaming process itself.

use std::future::Future;

use gdbs_core::prelude::*;
use gdbs_core::{logging, LogRole};

pub use gdbs_app::{AppConfig, CliOverrides};

fn install_error_hooks() -> Result<()> {
    color_eyre::install()
        .map_err(|e| Error::config(format!("Failed to install error hooks: {}", e)))
}

/// Control process: JSON-RPC over stdio plus a supervised streaming child
pub async fn run_mcp(config: AppConfig) -> Result<()> {
    install_error_hooks()?;
    logging::init(LogRole::Control)?;

    info!("Base directory: {}", config.base_dir().display());
    info!("Transcript: {}", config.log_path().display());

    gdbs_app::run_control(config)
        .await
        .context("Control channel stopped")
}

/// Streaming process: serve tails of the transcript until told to stop.
///
/// With `exit_on_stdin_close`, end-of-file on stdin also stops the server;
/// the supervisor uses this as its graceful stop request.
pub async fn run_tail(config: AppConfig, exit_on_stdin_close: bool) -> Result<()> {
    install_error_hooks()?;
    logging::init(LogRole::Stream)?;

    let (host, port) = (config.settings().server.host.clone(), config.settings().server.port);
    serve_stream(config, exit_on_stdin_close)
        .await
        .with_context(|| format!("Streaming server for {}:{} stopped", host, port))
}

async fn serve_stream(config: AppConfig, exit_on_stdin_close: bool) -> Result<()> {
    let shutdown = async move {
        tokio::select! {
            _ = gdbs_core::signals::shutdown_requested() => {}
            _ = stdin_close_requested(exit_on_stdin_close) => info!("Supervisor closed stdin"),
        }
    };
    gdbs_stream::run(config.stream_config(), shutdown).await
}

fn stdin_close_requested(enabled: bool) -> impl Future<Output = ()> {
    async move {
        if enabled {
            gdbs_stream::stdin_closed().await;
        } else {
            std::future::pending::<()>().await;
        }
    }
}

/// Write a commented `.gdbs/config.toml` under the base directory
pub fn init_config(config: &AppConfig) -> Result<()> {
    gdbs_app::init_config_dir(config.base_dir())?;
    eprintln!(
        "Wrote {}",
        gdbs_app::config::config_path(config.base_dir()).display()
    );
    Ok(())
}
