//! # gdbs-stream - Transcript Streaming Server
//!
//! The streaming process: one TCP listener that upgrades WebSocket requests
//! into live tails of the GDB transcript and answers every other HTTP request
//! with a JSON status document.
//!
//! ## Public API
//!
//! - [`run()`] - Allocate a port, publish it, serve until shutdown
//! - [`StreamConfig`] - Host, preferred port, tail options, handshake path
//! - [`port`] - Bindability probe and ascending fallback search
//! - [`StreamMessage`] - `meta` / `line` / `error` wire frames
//! - [`TailCursor`] - End-anchored incremental reader

pub mod gateway;
pub mod port;
pub mod protocol;
pub mod server;
pub mod tail;

pub use gateway::Gateway;
pub use protocol::{stream_url, StatusDocument, StreamMessage, SERVICE_NAME};
pub use server::{run, stdin_closed, StreamConfig};
pub use tail::{TailCursor, TailOptions, DEFAULT_IDLE_POLL};
