//! # gdbs-app - Control Channel
//!
//! Configuration layering, the stdio JSON-RPC control channel and the tool
//! handlers behind `tools/call`.
//!
//! ## Public API
//!
//! - [`AppConfig`] - Defaults, `.gdbs/config.toml`, environment and CLI layers
//! - [`ControlServer`] - Request dispatch and the line-delimited serving loop
//! - [`run_control()`] - Supervise the streaming process and serve stdio
//! - [`Tool`] - The advertised tool catalogue

pub mod config;
pub mod rpc;
pub mod server;
pub mod tools;

pub use config::{init_config_dir, AppConfig, CliOverrides, Settings};
pub use server::{run as run_control, ControlServer};
pub use tools::{Tool, ToolContext};
