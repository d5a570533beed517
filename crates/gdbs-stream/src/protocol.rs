//! Wire messages sent to stream subscribers and the plain-HTTP status document.

use serde::{Deserialize, Serialize};
use url::Url;

use gdbs_core::prelude::*;
use gdbs_core::LogFile;

/// Name reported in the status document
pub const SERVICE_NAME: &str = "gdb-tail-websocket-server";

/// One JSON text frame on a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    /// First frame of every successful subscription
    Meta { filename: String, size: u64 },
    /// One appended line, trailing newline stripped
    Line { data: String },
    /// Terminal failure, the connection closes right after
    Error { msg: String },
}

impl StreamMessage {
    pub fn meta(filename: impl Into<String>, size: u64) -> Self {
        Self::Meta {
            filename: filename.into(),
            size,
        }
    }

    pub fn line(data: impl Into<String>) -> Self {
        Self::Line { data: data.into() }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error { msg: msg.into() }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `ws://<host>:<port>` as a parsed URL
pub fn stream_url(host: &str, port: u16) -> Result<Url> {
    Url::parse(&format!("ws://{host}:{port}"))
        .map_err(|e| Error::config(format!("invalid stream URL for {host}:{port}: {e}")))
}

/// Body returned to non-upgrade HTTP requests
#[derive(Debug, Clone, Serialize)]
pub struct StatusDocument {
    pub status: &'static str,
    pub service: &'static str,
    pub file: FileStatus,
    pub websocket: WebSocketStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    pub path: String,
    pub exists: bool,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebSocketStatus {
    pub url: String,
    pub note: &'static str,
}

impl StatusDocument {
    /// Snapshot of the transcript as seen right now
    pub fn snapshot(log_file: &LogFile, advertised_url: &str) -> Self {
        Self {
            status: "running",
            service: SERVICE_NAME,
            file: FileStatus {
                path: log_file.path().display().to_string(),
                exists: log_file.exists(),
                size: log_file.size(),
            },
            websocket: WebSocketStatus {
                url: advertised_url.to_string(),
                note: "Use a WebSocket client to connect to this URL for streaming",
            },
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
