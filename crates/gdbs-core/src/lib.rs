//! # gdbs-core - Core Types
//!
//! Foundation crate for gdb-streamer. Provides error handling, logging setup,
//! the handshake store used to publish the streaming port, the transcript
//! file utilities, and the GDB transcript analysis engine.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, regex, tracing, tokio).
//!
//! ## Public API
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Handshake (`handshake`)
//! - [`HandshakeStore`] - Single-writer / bounded-retry-reader port record
//! - [`ResolvedPort`], [`PortSource`] - Outcome of a read
//!
//! ### Transcript File (`log_file`)
//! - [`LogFile`] - Existence, size, line count, tail and truncation
//!
//! ### Analysis (`analysis`)
//! - [`analyze()`] - Scan a transcript into [`AnalysisFindings`]
//! - [`render()`] - Render findings as a markdown report
//!
//! ### Signals (`signals`)
//! - [`signals::shutdown_requested()`] - Resolves on SIGINT/SIGTERM
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use gdbs_core::prelude::*;
//! ```

pub mod analysis;
pub mod error;
pub mod handshake;
pub mod log_file;
pub mod logging;
pub mod prelude;
pub mod signals;

// Re-export commonly used types at crate root for convenience
pub use analysis::{
    analyze, render, AnalysisFindings, Breakpoint, DetailLevel, ErrorFinding, ExecutionStatus,
    FileInfo, Focus, WarningFinding,
};
pub use error::{Error, Result, ResultExt};
pub use handshake::{HandshakeStore, PortSource, ResolvedPort};
pub use log_file::{LogFile, LogFileInfo};
pub use logging::LogRole;
