//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Which process is initializing logging.
///
/// Each role writes its own log file. The streaming process also mirrors
/// events to stderr so the supervisor can forward them; the control-channel
/// process never does, since stdout/stderr belong to the RPC client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRole {
    /// Control channel + supervisor (`gdbs mcp`)
    Control,
    /// Streaming server (`gdbs tail`)
    Stream,
}

impl LogRole {
    fn file_name(self) -> &'static str {
        match self {
            LogRole::Control => "gdbs-mcp.log",
            LogRole::Stream => "gdbs-tail.log",
        }
    }
}

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/gdb-streamer/logs/`
/// Log level is controlled by `GDBS_LOG` environment variable.
///
/// # Examples
/// ```bash
/// GDBS_LOG=debug gdbs mcp
/// GDBS_LOG=gdbs_stream=trace gdbs tail
/// ```
pub fn init(role: LogRole) -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, role.file_name());

    let env_filter = EnvFilter::try_from_env("GDBS_LOG").unwrap_or_else(|_| {
        EnvFilter::new("gdb_streamer=info,gdbs_core=info,gdbs_stream=info,gdbs_daemon=info,gdbs_app=info,warn")
    });

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_timer(fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ));

    let stderr_layer = (role == LogRole::Stream).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(false)
            .without_time()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("gdb-streamer starting ({:?})", role);
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("gdb-streamer").join("logs"))
}

