//! gdbs - stream and explain a GDB transcript
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gdb_streamer::{AppConfig, CliOverrides};
use gdbs_core::prelude::*;

/// Stream and explain a GDB transcript over stdio JSON-RPC and WebSocket
#[derive(Parser, Debug)]
#[command(name = "gdbs", version)]
#[command(about = "Stream and explain a GDB transcript", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory holding the transcript, port file and .gdbs/config.toml
    #[arg(long, global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Transcript to tail and analyze (default: <base-dir>/gdb.txt)
    #[arg(long, global = true, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Streaming listener host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Preferred streaming port
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Serve JSON-RPC on stdio and supervise the streaming server (default)
    Mcp,
    /// Run the streaming server in the foreground
    Tail {
        /// Stop when stdin reaches end-of-file
        #[arg(long)]
        exit_on_stdin_close: bool,
    },
    /// Write a default .gdbs/config.toml
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let base_dir = args
        .base_dir
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let overrides = CliOverrides {
        file: args.file,
        host: args.host,
        port: args.port,
    };
    let config = AppConfig::load(&base_dir, &overrides);

    match args.command.unwrap_or(Command::Mcp) {
        Command::Mcp => gdb_streamer::run_mcp(config).await,
        Command::Tail {
            exit_on_stdin_close,
        } => gdb_streamer::run_tail(config, exit_on_stdin_close).await,
        Command::InitConfig => gdb_streamer::init_config(&config),
    }
}
