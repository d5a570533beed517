//! The tailed transcript file and its whole-file utilities.
//!
//! The file is append-only from the system's point of view: an external
//! writer appends GDB output and the only mutation performed here is an
//! explicit, confirmed truncation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::prelude::*;

/// Snapshot of the file's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileInfo {
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
    pub line_count: usize,
}

/// Handle to the transcript file at a stable path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories, for display
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Current size in bytes, or 0 when absent
    pub fn size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Read the whole file, decoding invalid UTF-8 lossily
    pub fn read_all(&self) -> Result<String> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::log_file_missing(&self.path))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read the last `count` lines (all lines when `count == 0`).
    ///
    /// Lines keep their trailing newline so joining them reproduces the file.
    pub fn read_lines(&self, count: usize) -> Result<Vec<String>> {
        let content = self.read_all()?;
        let lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
        if count == 0 || count >= lines.len() {
            return Ok(lines);
        }
        Ok(lines[lines.len() - count..].to_vec())
    }

    /// Metadata snapshot. `Ok(None)` when the file does not exist.
    pub fn info(&self) -> Result<Option<LogFileInfo>> {
        if !self.exists() {
            return Ok(None);
        }

        let metadata = std::fs::metadata(&self.path)?;
        let modified = metadata.modified().ok().map(DateTime::<Local>::from);
        let line_count = self.read_all()?.split_inclusive('\n').count();

        Ok(Some(LogFileInfo {
            size: metadata.len(),
            modified,
            line_count,
        }))
    }

    /// Truncate the file to zero length.
    ///
    /// Returns `false` when there was nothing to clear.
    pub fn clear(&self) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        std::fs::write(&self.path, b"")?;
        info!("Cleared {}", self.path.display());
        Ok(true)
    }
}
