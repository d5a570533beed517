//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Log File Errors
    // ─────────────────────────────────────────────────────────────
    #[error("file not found: {}", path.display())]
    LogFileMissing { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Network Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No available port in {start}..{} on {host}", u32::from(*start) + u32::from(*attempts))]
    PortExhausted { host: String, start: u16, attempts: u16 },

    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("WebSocket error: {message}")]
    WebSocket { message: String },

    // ─────────────────────────────────────────────────────────────
    // Process Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to spawn streaming process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Streaming process error: {message}")]
    Process { message: String },

    #[error("Signal handler error: {message}")]
    Signal { message: String },

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn log_file_missing(path: impl Into<PathBuf>) -> Self {
        Self::LogFileMissing { path: path.into() }
    }

    pub fn bind(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Bind {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn signal(message: impl Into<String>) -> Self {
        Self::Signal {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::LogFileMissing { .. }
                | Error::WebSocket { .. }
                | Error::Protocol { .. }
        )
    }

    /// Check if this error should terminate the process that hit it
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::PortExhausted { .. } | Error::Bind { .. } | Error::ProcessSpawn { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Log an error with a description of what failed, then pass it on.
///
/// For boundaries that report an error and still return it, such as the
/// process entry points.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the description only on failure
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.with_context(|| context.into())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            if err.is_recoverable() {
                tracing::warn!("{}: {}", f(), err);
            } else {
                tracing::error!("{}: {}", f(), err);
            }
            err
        })
    }
}
