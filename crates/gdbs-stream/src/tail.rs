//! Per-subscriber transcript tailing.
//!
//! Each subscriber owns an independent [`TailCursor`] starting at end-of-file
//! when it connects; nothing written earlier is replayed. Messages go out
//! through a bounded channel so a slow subscriber only ever stalls its own
//! cursor.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;

use gdbs_core::prelude::*;
use gdbs_core::LogFile;

use crate::protocol::StreamMessage;

/// Default delay before re-checking the file when nothing new was read
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(200);

/// Tuning for one subscription
#[derive(Debug, Clone)]
pub struct TailOptions {
    pub path: PathBuf,
    /// Sleep between polls that returned no complete line
    pub idle_poll: Duration,
    /// Pause after each sent line; zero disables throttling
    pub send_interval: Duration,
}

impl TailOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            idle_poll: DEFAULT_IDLE_POLL,
            send_interval: Duration::ZERO,
        }
    }

    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }

    pub fn with_send_interval(mut self, send_interval: Duration) -> Self {
        self.send_interval = send_interval;
        self
    }
}

/// Read position in the transcript plus any incomplete trailing line
#[derive(Debug)]
pub struct TailCursor {
    file: File,
    position: u64,
    pending: Vec<u8>,
}

impl TailCursor {
    /// Open `path` positioned at its current end
    pub async fn open_at_end(path: &Path) -> Result<Self> {
        let mut file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::log_file_missing(path));
            }
            Err(e) => return Err(e.into()),
        };
        let position = file.seek(SeekFrom::End(0)).await?;

        Ok(Self {
            file,
            position,
            pending: Vec::new(),
        })
    }

    /// Byte offset of the next read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read every complete line appended since the last call.
    ///
    /// A trailing fragment without a newline stays buffered until it is
    /// completed. If the file shrank below the cursor it was truncated; the
    /// cursor moves to the new end and nothing is returned for this poll.
    pub async fn read_lines(&mut self) -> Result<Vec<String>> {
        let len = self.file.metadata().await?.len();
        if len < self.position {
            debug!(
                "Transcript truncated from {} to {} bytes, resetting cursor",
                self.position, len
            );
            self.position = self.file.seek(SeekFrom::End(0)).await?;
            self.pending.clear();
            return Ok(Vec::new());
        }

        let mut chunk = Vec::new();
        let read = self.file.read_to_end(&mut chunk).await?;
        self.position += read as u64;
        self.pending.extend_from_slice(&chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Ok(Vec::new());
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        Ok(complete[..last_newline]
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect())
    }
}

/// Stream newly appended lines into `tx` until the receiver goes away.
///
/// Sends one `meta` frame first. A missing file, or any failure after the
/// subscription started, produces a single `error` frame and an `Err`
/// return. `Ok` means the subscriber went away.
pub async fn run_subscription(options: &TailOptions, tx: mpsc::Sender<StreamMessage>) -> Result<()> {
    match stream_lines(options, &tx).await {
        Ok(()) => Ok(()),
        Err(Error::ChannelClosed) => Ok(()),
        Err(e) => {
            let _ = tx.send(StreamMessage::error(e.to_string())).await;
            Err(e)
        }
    }
}

async fn stream_lines(options: &TailOptions, tx: &mpsc::Sender<StreamMessage>) -> Result<()> {
    let log_file = LogFile::new(&options.path);
    let mut cursor = TailCursor::open_at_end(log_file.path()).await?;

    send(tx, StreamMessage::meta(log_file.name(), cursor.position())).await?;

    loop {
        let lines = cursor.read_lines().await?;

        if lines.is_empty() {
            tokio::select! {
                _ = tx.closed() => return Ok(()),
                _ = tokio::time::sleep(options.idle_poll) => {}
            }
            continue;
        }

        for line in lines {
            send(tx, StreamMessage::line(line)).await?;
            if !options.send_interval.is_zero() {
                tokio::time::sleep(options.send_interval).await;
            }
        }
    }
}

async fn send(tx: &mpsc::Sender<StreamMessage>, message: StreamMessage) -> Result<()> {
    tx.send(message).await.map_err(|_| Error::ChannelClosed)
}
