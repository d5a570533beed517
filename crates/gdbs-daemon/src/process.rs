//! Streaming child process management

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

use gdbs_core::prelude::*;

use crate::events::TailEvent;

/// Default time the child gets to exit after its stdin is closed
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(2000);

/// How long output pipes may stay open after the child has exited
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Program and arguments used to launch the streaming process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl TailCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Re-invoke the running executable
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| Error::ProcessSpawn {
            reason: format!("cannot locate own executable: {}", e),
        })?;
        Ok(Self::new(program))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A running streaming child.
///
/// The `Child` itself is owned by a background wait task that reports
/// `TailEvent::Exited` only after both output pipes have been read to the
/// end. Dropping the held stdin is the graceful stop request; `kill_tx`
/// is the forced one.
pub struct TailProcess {
    stdin: Option<ChildStdin>,
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exited: Arc<AtomicBool>,
    exit_notify: Arc<Notify>,
}

impl TailProcess {
    /// Spawn `command`, forwarding its output to `event_tx`
    pub fn spawn(command: &TailCommand, event_tx: mpsc::Sender<TailEvent>) -> Result<Self> {
        info!("Spawning streaming process: {}", command.display());

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ProcessSpawn {
                reason: format!("{}: {}", command.program.display(), e),
            })?;

        let pid = child.id();
        info!("Streaming process started with PID: {:?}", pid);

        Ok(Pipes::take(&mut child, event_tx).attach(child, pid))
    }

    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        mut pipes: Pipes,
        watch: ExitWatch,
    ) {
        let status = tokio::select! {
            status = child.wait() => status,
            _ = kill_rx => {
                warn!("Grace period over, killing streaming process");
                if let Err(e) = child.start_kill() {
                    error!("Failed to kill streaming process: {}", e);
                }
                child.wait().await
            }
        };

        let code = match status {
            Ok(status) => {
                info!("Streaming process exited: {}", status);
                status.code()
            }
            Err(e) => {
                error!("Lost track of streaming process: {}", e);
                None
            }
        };
        watch.mark_exited();

        pipes.drain().await;
        let _ = pipes.event_tx.send(TailEvent::Exited { code }).await;
    }

    /// Forward lines from one pipe until it closes
    async fn line_reader<R>(pipe: R, tx: mpsc::Sender<TailEvent>, wrap: fn(String) -> TailEvent)
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(pipe).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!("child: {}", line);
            if tx.send(wrap(line)).await.is_err() {
                break;
            }
        }
    }

    /// Stop the child: close its stdin, wait up to `grace`, then force-kill.
    pub async fn shutdown(&mut self, grace: Duration) -> Result<()> {
        if self.has_exited() {
            debug!("Streaming process already exited");
            return Ok(());
        }

        info!("Stopping streaming process (grace {:?})", grace);

        // Registered before stdin is dropped so an immediate exit still wakes us
        let notified = self.exit_notify.notified();
        drop(self.stdin.take());
        if self.has_exited() {
            return Ok(());
        }

        if tokio::time::timeout(grace, notified).await.is_err() {
            self.force_kill();
        }
        Ok(())
    }

    fn force_kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    pub fn id(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for TailProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            warn!("Streaming process handle dropped while the child may still run");
            self.force_kill();
        }
    }
}

/// Output pipes of a freshly spawned child
struct Pipes {
    stdin: Option<ChildStdin>,
    readers: Vec<JoinHandle<()>>,
    event_tx: mpsc::Sender<TailEvent>,
}

impl Pipes {
    fn take(child: &mut Child, event_tx: mpsc::Sender<TailEvent>) -> Self {
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(TailProcess::line_reader(
                stdout,
                event_tx.clone(),
                TailEvent::Stdout,
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(TailProcess::line_reader(
                stderr,
                event_tx.clone(),
                TailEvent::Stderr,
            )));
        }
        Self {
            stdin: child.stdin.take(),
            readers,
            event_tx,
        }
    }

    /// Wait for both readers to hit end-of-file.
    ///
    /// Bounded, since a grandchild can inherit the pipes and keep them open.
    async fn drain(&mut self) {
        let readers = std::mem::take(&mut self.readers);
        let drained = tokio::time::timeout(PIPE_DRAIN_TIMEOUT, async {
            for reader in readers {
                let _ = reader.await;
            }
        })
        .await;
        if drained.is_err() {
            debug!("Output pipes still open {:?} after exit", PIPE_DRAIN_TIMEOUT);
        }
    }

    fn attach(mut self, child: Child, pid: Option<u32>) -> TailProcess {
        let watch = ExitWatch::default();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let stdin = self.stdin.take();

        let process = TailProcess {
            stdin,
            pid,
            kill_tx: Some(kill_tx),
            exited: Arc::clone(&watch.exited),
            exit_notify: Arc::clone(&watch.notify),
        };
        tokio::spawn(TailProcess::wait_for_exit(child, kill_rx, self, watch));
        process
    }
}

/// Exit flag plus wakeup, shared between the wait task and the handle
#[derive(Default)]
struct ExitWatch {
    exited: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ExitWatch {
    fn mark_exited(&self) {
        self.exited.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}
