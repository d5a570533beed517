//! Settings loading for .gdbs/config.toml plus environment and CLI layers

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::types::{CliOverrides, Settings};
use gdbs_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const GDBS_DIR: &str = ".gdbs";
const DOTENV_FILENAME: &str = ".env";

/// Environment variables honoured on top of the config file
pub const ENV_FILE_PATH: &str = "FILE_PATH";
pub const ENV_WS_HOST: &str = "WS_HOST";
pub const ENV_WS_PORT: &str = "WS_PORT";
pub const ENV_SEND_INTERVAL: &str = "SEND_INTERVAL";
pub const ENV_READ_CHUNK_DELAY: &str = "READ_CHUNK_DELAY";

// ─────────────────────────────────────────────────────────────────────────────
// File layer
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the config file under `base_dir`
pub fn config_path(base_dir: &Path) -> PathBuf {
    base_dir.join(GDBS_DIR).join(CONFIG_FILENAME)
}

/// Load settings from .gdbs/config.toml
///
/// Returns default settings if file doesn't exist or can't be parsed.
pub fn load_settings(base_dir: &Path) -> Settings {
    let config_path = config_path(base_dir);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create a commented default config file in .gdbs/
pub fn init_config_dir(base_dir: &Path) -> Result<()> {
    let gdbs_dir = base_dir.join(GDBS_DIR);

    if !gdbs_dir.exists() {
        std::fs::create_dir_all(&gdbs_dir)
            .map_err(|e| Error::config(format!("Failed to create .gdbs dir: {}", e)))?;
    }

    let config_path = gdbs_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# gdb-streamer configuration
#
# Environment variables FILE_PATH, WS_HOST, WS_PORT, SEND_INTERVAL and
# READ_CHUNK_DELAY override these values; command-line flags override both.

[log]
# path = "gdb.txt"          # Relative paths are resolved against the base dir

[server]
host = "0.0.0.0"
port = 8765                 # Preferred port; the next free one is used if taken
max_port_attempts = 10
send_interval_ms = 0        # Pause after each streamed line
idle_poll_ms = 200          # Re-check delay when no new line is available

[handshake]
# path = ".ws_port"
read_attempts = 10
retry_delay_ms = 100

[supervisor]
shutdown_grace_ms = 2000
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Wrote default config to {:?}", config_path);
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment layer
// ─────────────────────────────────────────────────────────────────────────────

/// Apply overrides from the process environment, then `<base_dir>/.env`
pub fn apply_env_overrides(settings: &mut Settings, base_dir: &Path) {
    let dotenv = load_dotenv(base_dir);
    apply_env_with(settings, |key| {
        std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
    });
}

/// Read `<base_dir>/.env` without touching the process environment.
///
/// A missing file is empty; a malformed one is logged and its good
/// entries before the error are kept.
pub fn load_dotenv(base_dir: &Path) -> HashMap<String, String> {
    let path = base_dir.join(DOTENV_FILENAME);
    let entries = match dotenvy::from_path_iter(&path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return HashMap::new(),
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            return HashMap::new();
        }
    };

    let mut vars = HashMap::new();
    for entry in entries {
        match entry {
            Ok((key, value)) => {
                vars.insert(key, value);
            }
            Err(e) => {
                warn!("Stopped reading {:?}: {}", path, e);
                break;
            }
        }
    }
    debug!("Loaded {} variable(s) from {:?}", vars.len(), path);
    vars
}

/// Apply overrides using `lookup` as the environment.
///
/// Unparseable values are logged and ignored.
pub fn apply_env_with<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(ENV_FILE_PATH).filter(|v| !v.trim().is_empty()) {
        settings.log.path = Some(PathBuf::from(path));
    }

    if let Some(host) = lookup(ENV_WS_HOST).filter(|v| !v.trim().is_empty()) {
        settings.server.host = host.trim().to_string();
    }

    if let Some(raw) = lookup(ENV_WS_PORT) {
        match raw.trim().parse::<u16>() {
            Ok(port) => settings.server.port = port,
            Err(e) => warn!("Ignoring {}={:?}: {}", ENV_WS_PORT, raw, e),
        }
    }

    if let Some(raw) = lookup(ENV_SEND_INTERVAL) {
        match seconds_to_millis(&raw) {
            Some(ms) => settings.server.send_interval_ms = ms,
            None => warn!("Ignoring {}={:?}: not a duration in seconds", ENV_SEND_INTERVAL, raw),
        }
    }

    if let Some(raw) = lookup(ENV_READ_CHUNK_DELAY) {
        match seconds_to_millis(&raw) {
            Some(ms) => settings.server.idle_poll_ms = ms,
            None => warn!("Ignoring {}={:?}: not a duration in seconds", ENV_READ_CHUNK_DELAY, raw),
        }
    }
}

/// Parse a non-negative float number of seconds into whole milliseconds
pub fn seconds_to_millis(raw: &str) -> Option<u64> {
    let secs: f64 = raw.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}

// ─────────────────────────────────────────────────────────────────────────────
// CLI layer
// ─────────────────────────────────────────────────────────────────────────────

pub fn apply_cli_overrides(settings: &mut Settings, overrides: &CliOverrides) {
    if let Some(file) = &overrides.file {
        settings.log.path = Some(file.clone());
    }
    if let Some(host) = &overrides.host {
        settings.server.host = host.clone();
    }
    if let Some(port) = overrides.port {
        settings.server.port = port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_settings_missing_file_is_default() {
        let dir = tempdir().unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_load_settings_invalid_toml_is_default() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(GDBS_DIR)).unwrap();
        std::fs::write(config_path(dir.path()), "[server\nport = ").unwrap();

        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_init_config_dir_round_trips_defaults() {
        let dir = tempdir().unwrap();
        init_config_dir(dir.path()).unwrap();

        assert!(config_path(dir.path()).exists());
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_init_config_dir_keeps_existing_file() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(GDBS_DIR)).unwrap();
        std::fs::write(config_path(dir.path()), "[server]\nport = 9100\n").unwrap();

        init_config_dir(dir.path()).unwrap();
        assert_eq!(load_settings(dir.path()).server.port, 9100);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        apply_env_with(
            &mut settings,
            env(&[
                ("FILE_PATH", "/var/log/gdb.txt"),
                ("WS_HOST", "127.0.0.1"),
                ("WS_PORT", "9001"),
                ("SEND_INTERVAL", "0.05"),
                ("READ_CHUNK_DELAY", "1.5"),
            ]),
        );

        assert_eq!(settings.log.path, Some(PathBuf::from("/var/log/gdb.txt")));
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9001);
        assert_eq!(settings.server.send_interval_ms, 50);
        assert_eq!(settings.server.idle_poll_ms, 1500);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut settings = Settings::default();
        apply_env_with(
            &mut settings,
            env(&[("WS_PORT", "http"), ("SEND_INTERVAL", "-1"), ("READ_CHUNK_DELAY", "NaN")]),
        );
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_cli_beats_env() {
        let mut settings = Settings::default();
        apply_env_with(&mut settings, env(&[("WS_PORT", "9001"), ("WS_HOST", "10.0.0.1")]));
        apply_cli_overrides(
            &mut settings,
            &CliOverrides {
                port: Some(9002),
                ..Default::default()
            },
        );

        assert_eq!(settings.server.port, 9002);
        assert_eq!(settings.server.host, "10.0.0.1");
    }

    #[test]
    fn test_seconds_to_millis() {
        assert_eq!(seconds_to_millis("0"), Some(0));
        assert_eq!(seconds_to_millis(" 0.2 "), Some(200));
        assert_eq!(seconds_to_millis("3"), Some(3000));
        assert_eq!(seconds_to_millis("inf"), None);
        assert_eq!(seconds_to_millis("soon"), None);
    }

    #[test]
    #[serial]
    fn test_apply_env_overrides_reads_process_env() {
        let dir = tempdir().unwrap();
        std::env::set_var(ENV_WS_PORT, "9555");
        let mut settings = Settings::default();
        apply_env_overrides(&mut settings, dir.path());
        std::env::remove_var(ENV_WS_PORT);

        assert_eq!(settings.server.port, 9555);
    }

    #[test]
    fn test_load_dotenv_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load_dotenv(dir.path()).is_empty());
    }

    #[test]
    fn test_load_dotenv_reads_pairs() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "# deployment\nFILE_PATH=/srv/gdb.txt\nWS_PORT=\"9100\"\n",
        )
        .unwrap();

        let vars = load_dotenv(dir.path());
        assert_eq!(vars.get("FILE_PATH").map(String::as_str), Some("/srv/gdb.txt"));
        assert_eq!(vars.get("WS_PORT").map(String::as_str), Some("9100"));
    }

    #[test]
    #[serial]
    fn test_process_env_wins_over_dotenv() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "WS_HOST=10.1.1.1\nWS_PORT=9100\n").unwrap();
        std::env::set_var(ENV_WS_HOST, "127.0.0.2");
        std::env::remove_var(ENV_WS_PORT);

        let mut settings = Settings::default();
        apply_env_overrides(&mut settings, dir.path());
        std::env::remove_var(ENV_WS_HOST);

        assert_eq!(settings.server.host, "127.0.0.2");
        assert_eq!(settings.server.port, 9100);
    }
}
