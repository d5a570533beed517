//! Keeps the streaming process alive alongside the control channel.
//!
//! Child output is relayed line by line to this process's stderr with a
//! `[tail-out]` / `[tail-err]` prefix; stdout belongs to the control channel.

use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use gdbs_core::prelude::*;

use crate::events::TailEvent;
use crate::process::{TailCommand, TailProcess, DEFAULT_SHUTDOWN_GRACE};

const EVENT_BUFFER: usize = 256;

/// Running streaming process plus its output relay
pub struct Supervisor {
    process: TailProcess,
    relay: JoinHandle<Option<i32>>,
    grace: Duration,
}

impl Supervisor {
    /// Launch `command` and start relaying its output to stderr
    pub fn start(command: &TailCommand) -> Result<Self> {
        Self::start_with_sink(command, std::io::stderr)
    }

    /// Launch with a custom destination for relayed lines
    pub fn start_with_sink<W, F>(command: &TailCommand, sink: F) -> Result<Self>
    where
        W: Write + Send + 'static,
        F: Fn() -> W + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let process = TailProcess::spawn(command, event_tx)?;
        let relay = tokio::spawn(relay_output(event_rx, sink));

        Ok(Self {
            process,
            relay,
            grace: DEFAULT_SHUTDOWN_GRACE,
        })
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn id(&self) -> Option<u32> {
        self.process.id()
    }

    /// Stop the child and wait for the relay to drain.
    ///
    /// Returns the child's exit code when it exited normally.
    pub async fn shutdown(mut self) -> Result<Option<i32>> {
        self.process.shutdown(self.grace).await?;
        self.relay
            .await
            .map_err(|e| Error::process(format!("output relay failed: {}", e)))
    }
}

/// Format a child line the way it appears on our stderr
pub fn relay_line(event: &TailEvent) -> Option<String> {
    match event {
        TailEvent::Stdout(line) => Some(format!("[tail-out] {}", line)),
        TailEvent::Stderr(line) => Some(format!("[tail-err] {}", line)),
        TailEvent::Exited { .. } => None,
    }
}

async fn relay_output<W, F>(mut rx: mpsc::Receiver<TailEvent>, sink: F) -> Option<i32>
where
    W: Write + Send,
    F: Fn() -> W,
{
    while let Some(event) = rx.recv().await {
        if let TailEvent::Exited { code } = event {
            match code {
                Some(0) => info!("Streaming process exited"),
                Some(code) => warn!("Streaming process exited with code {}", code),
                None => warn!("Streaming process terminated by signal"),
            }
            return code;
        }
        if let Some(line) = relay_line(&event) {
            let mut out = sink();
            let _ = writeln!(out, "{}", line);
            let _ = out.flush();
        }
    }
    None
}
