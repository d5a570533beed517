//! Configuration types for gdb-streamer
//!
//! `Settings` mirrors `.gdbs/config.toml`. Path fields left unset are derived
//! from the base directory when the configuration is resolved.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings (.gdbs/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub log: LogSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub handshake: HandshakeSettings,

    #[serde(default)]
    pub supervisor: SupervisorSettings,
}

/// The transcript being tailed and analyzed
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LogSettings {
    /// Transcript path; `<base_dir>/gdb.txt` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Streaming listener
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    /// Preferred port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Ports probed from `port` upward, `port` included
    #[serde(default = "default_max_port_attempts")]
    pub max_port_attempts: u16,

    /// Pause after each streamed line (0 = no throttle)
    #[serde(default)]
    pub send_interval_ms: u64,

    /// Re-check delay when no new line is available
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_port_attempts: default_max_port_attempts(),
            send_interval_ms: 0,
            idle_poll_ms: default_idle_poll_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_max_port_attempts() -> u16 {
    10
}

fn default_idle_poll_ms() -> u64 {
    200
}

/// Port record shared between the streaming and control processes
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HandshakeSettings {
    /// Record path; `<base_dir>/.ws_port` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            path: None,
            read_attempts: default_read_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_read_attempts() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    100
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SupervisorSettings {
    /// Time the streaming process gets to exit before it is killed
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

/// Values given on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub file: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}
