//! # gdbs-daemon - Streaming Process Supervision
//!
//! Spawns the streaming process as a child of the control process, relays its
//! output, and stops it on shutdown.
//!
//! ## Public API
//!
//! - [`TailCommand`] - Program and arguments to launch
//! - [`TailProcess`] - Child handle with graceful-then-forced shutdown
//! - [`TailEvent`] - Stdout / stderr lines and exit notification
//! - [`Supervisor`] - Process plus `[tail-out]` / `[tail-err]` stderr relay

pub mod events;
pub mod process;
pub mod supervisor;

pub use events::TailEvent;
pub use process::{TailCommand, TailProcess, DEFAULT_SHUTDOWN_GRACE};
pub use supervisor::{relay_line, Supervisor};
