//! Handshake store for the bound streaming port.
//!
//! The streaming process is the single writer: it publishes the port it
//! actually bound once at startup and clears the record on clean shutdown.
//! The supervisor only reads, with a bounded retry loop that tolerates the
//! writer not having published yet (absent file, or a partially written /
//! empty file that fails to parse).
//!
//! Staleness: a record left behind by a listener that died without cleanup
//! is returned as-is. Callers surface the eventual connection failure rather
//! than re-reading forever.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::prelude::*;

/// Default number of read attempts before falling back
pub const DEFAULT_READ_ATTEMPTS: u32 = 10;

/// Default delay between read attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Where a resolved port came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSource {
    /// Read from a record published by the streaming process
    Published,
    /// All attempts exhausted; the configured default was used
    Fallback,
}

/// Outcome of [`HandshakeStore::read`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPort {
    pub port: u16,
    pub source: PortSource,
    /// Number of waits performed before the port was resolved
    pub retries: u32,
}

/// File-backed single-writer / bounded-retry-reader port exchange
#[derive(Debug, Clone)]
pub struct HandshakeStore {
    path: PathBuf,
    read_attempts: u32,
    retry_delay: Duration,
    fallback_port: u16,
}

impl HandshakeStore {
    pub fn new(path: impl Into<PathBuf>, fallback_port: u16) -> Self {
        Self {
            path: path.into(),
            read_attempts: DEFAULT_READ_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            fallback_port,
        }
    }

    pub fn with_retry(mut self, read_attempts: u32, retry_delay: Duration) -> Self {
        self.read_attempts = read_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fallback_port(&self) -> u16 {
        self.fallback_port
    }

    /// Publish `port` as the sole content of the record, replacing any prior value.
    ///
    /// The value is written to a sibling temp file and renamed into place so
    /// readers never observe a half-written record on platforms with atomic rename.
    pub fn publish(&self, port: u16) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, port.to_string())?;
        std::fs::rename(&tmp, &self.path)?;

        debug!("Published port {} to {}", port, self.path.display());
        Ok(())
    }

    /// Single read attempt. `Ok(None)` when the record is absent.
    pub fn read_once(&self) -> Result<Option<u16>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        content.trim().parse::<u16>().map(Some).map_err(|e| {
            Error::protocol(format!(
                "invalid port record {:?} in {}: {}",
                content.trim(),
                self.path.display(),
                e
            ))
        })
    }

    /// Resolve the published port, retrying up to the configured bound.
    ///
    /// Never fails: exhausting every attempt degrades to the fallback port,
    /// which the caller must be prepared to find unreachable.
    pub async fn read(&self) -> ResolvedPort {
        let mut retries = 0;

        for attempt in 1..=self.read_attempts {
            match self.read_once() {
                Ok(Some(port)) => {
                    return ResolvedPort {
                        port,
                        source: PortSource::Published,
                        retries,
                    }
                }
                Ok(None) => trace!("Port record not present yet (attempt {})", attempt),
                Err(e) if attempt == self.read_attempts => {
                    warn!("Could not read port from {}: {}", self.path.display(), e);
                }
                Err(e) => trace!("Port record unreadable (attempt {}): {}", attempt, e),
            }

            if attempt < self.read_attempts {
                tokio::time::sleep(self.retry_delay).await;
                retries += 1;
            }
        }

        debug!(
            "Port record unavailable after {} attempts, falling back to {}",
            self.read_attempts, self.fallback_port
        );
        ResolvedPort {
            port: self.fallback_port,
            source: PortSource::Fallback,
            retries,
        }
    }

    /// Remove the record. A missing record is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Cleared port record {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &Path) -> HandshakeStore {
        HandshakeStore::new(dir.join(".ws_port"), 8765).with_retry(3, Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_publish_then_read_returns_port_without_retries() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        store.publish(9001).unwrap();
        let resolved = store.read().await;

        assert_eq!(resolved.port, 9001);
        assert_eq!(resolved.source, PortSource::Published);
        assert_eq!(resolved.retries, 0);
    }

    #[tokio::test]
    async fn test_publish_overwrites_previous_value() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        store.publish(9001).unwrap();
        store.publish(9002).unwrap();

        assert_eq!(store.read_once().unwrap(), Some(9002));
        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            "9002",
            "record holds only the decimal port"
        );
    }

    #[tokio::test]
    async fn test_read_falls_back_when_absent() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let resolved = store.read().await;
        assert_eq!(resolved.port, 8765);
        assert_eq!(resolved.source, PortSource::Fallback);
        assert_eq!(resolved.retries, 2);
    }

    #[tokio::test]
    async fn test_read_falls_back_on_garbage() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        std::fs::write(store.path(), "not-a-port").unwrap();

        let resolved = store.read().await;
        assert_eq!(resolved.source, PortSource::Fallback);
        assert!(store.read_once().is_err());
    }

    #[tokio::test]
    async fn test_read_waits_for_late_writer() {
        let dir = tempdir().unwrap();
        let store = HandshakeStore::new(dir.path().join(".ws_port"), 1)
            .with_retry(50, Duration::from_millis(10));

        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer.publish(9100).unwrap();
        });

        let resolved = store.read().await;
        assert_eq!(resolved.port, 9100);
        assert_eq!(resolved.source, PortSource::Published);
        assert!(resolved.retries > 0);
    }

    #[test]
    fn test_clear_tolerates_absence() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        store.clear().unwrap();
        store.publish(9001).unwrap();
        store.clear().unwrap();
        assert_eq!(store.read_once().unwrap(), None);
    }

    #[test]
    fn test_read_once_trims_whitespace() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        std::fs::write(store.path(), "9003\n").unwrap();
        assert_eq!(store.read_once().unwrap(), Some(9003));
    }
}
