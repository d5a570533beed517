//! Configuration for gdb-streamer
//!
//! Layers, lowest precedence first:
//! - built-in defaults
//! - `.gdbs/config.toml` under the base directory
//! - environment (`FILE_PATH`, `WS_HOST`, `WS_PORT`, `SEND_INTERVAL`, `READ_CHUNK_DELAY`),
//!   falling back to `<base_dir>/.env`
//! - command-line flags

pub mod settings;
pub mod types;

pub use settings::{
    apply_cli_overrides, apply_env_overrides, apply_env_with, config_path, init_config_dir,
    load_dotenv, load_settings, seconds_to_millis,
};
pub use types::*;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gdbs_core::{HandshakeStore, LogFile};
use gdbs_daemon::TailCommand;
use gdbs_stream::{StreamConfig, TailOptions};

use gdbs_core::prelude::*;

const DEFAULT_LOG_FILENAME: &str = "gdb.txt";
const DEFAULT_HANDSHAKE_FILENAME: &str = ".ws_port";

/// Fully layered settings anchored at a base directory
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    base_dir: PathBuf,
    settings: Settings,
}

impl AppConfig {
    /// Resolve file, environment and CLI layers for `base_dir`
    pub fn load(base_dir: &Path, overrides: &CliOverrides) -> Self {
        let base_dir = dunce::canonicalize(base_dir).unwrap_or_else(|e| {
            debug!("Using base dir {:?} as given: {}", base_dir, e);
            base_dir.to_path_buf()
        });

        let mut settings = load_settings(&base_dir);
        apply_env_overrides(&mut settings, &base_dir);
        apply_cli_overrides(&mut settings, overrides);

        Self { base_dir, settings }
    }

    /// Wrap already-layered settings
    pub fn from_settings(base_dir: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            base_dir: base_dir.into(),
            settings,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn anchored(&self, path: Option<&PathBuf>, default_name: &str) -> PathBuf {
        match path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => self.base_dir.join(p),
            None => self.base_dir.join(default_name),
        }
    }

    /// Transcript path
    pub fn log_path(&self) -> PathBuf {
        self.anchored(self.settings.log.path.as_ref(), DEFAULT_LOG_FILENAME)
    }

    pub fn log_file(&self) -> LogFile {
        LogFile::new(self.log_path())
    }

    pub fn handshake_path(&self) -> PathBuf {
        self.anchored(self.settings.handshake.path.as_ref(), DEFAULT_HANDSHAKE_FILENAME)
    }

    /// Reader/writer for the port record; falls back to the configured port
    pub fn handshake_store(&self) -> HandshakeStore {
        let handshake = &self.settings.handshake;
        HandshakeStore::new(self.handshake_path(), self.settings.server.port).with_retry(
            handshake.read_attempts,
            Duration::from_millis(handshake.retry_delay_ms),
        )
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.settings.supervisor.shutdown_grace_ms)
    }

    /// Settings for the streaming process
    pub fn stream_config(&self) -> StreamConfig {
        let server = &self.settings.server;
        StreamConfig {
            host: server.host.clone(),
            port: server.port,
            max_port_attempts: server.max_port_attempts,
            tail: TailOptions::new(self.log_path())
                .with_idle_poll(Duration::from_millis(server.idle_poll_ms))
                .with_send_interval(Duration::from_millis(server.send_interval_ms)),
            handshake_path: self.handshake_path(),
        }
    }

    /// Arguments that make a `tail` child see the same configuration
    pub fn tail_args(&self) -> Vec<OsString> {
        vec![
            "tail".into(),
            "--exit-on-stdin-close".into(),
            "--base-dir".into(),
            self.base_dir.clone().into_os_string(),
            "--file".into(),
            self.log_path().into_os_string(),
            "--host".into(),
            self.settings.server.host.clone().into(),
            "--port".into(),
            self.settings.server.port.to_string().into(),
        ]
    }

    /// Command re-invoking this executable as the streaming process
    pub fn tail_command(&self) -> Result<TailCommand> {
        Ok(TailCommand::current_exe()?.args(self.tail_args()))
    }
}
