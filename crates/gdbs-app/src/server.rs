//! Stdio control channel.
//!
//! Line-delimited JSON-RPC 2.0: one request per stdin line, one compact
//! response per stdout line, flushed immediately. Nothing else may be written
//! to stdout while the channel is open.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use gdbs_core::prelude::*;
use gdbs_daemon::Supervisor;

use crate::config::AppConfig;
use crate::rpc::{self, Request, Response, METHOD_NOT_FOUND};
use crate::tools::{self, Tool, ToolContext};

/// Dispatches control-channel requests
#[derive(Debug, Clone)]
pub struct ControlServer {
    tools: ToolContext,
}

impl ControlServer {
    pub fn new(tools: ToolContext) -> Self {
        Self { tools }
    }

    /// Handle one raw input line. `None` means nothing is sent back.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match Request::parse(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!("Failed to parse request: {} line={}", e, line);
                None
            }
        }
    }

    pub async fn handle(&self, request: Request) -> Option<Response> {
        let id = request.id.clone().unwrap_or(Value::Null);

        match request.method.as_str() {
            "initialize" => Some(Response::result(id, rpc::initialize_result())),
            "tools/list" => Some(Response::result(id, tools::catalogue())),
            "tools/call" => Some(self.call_tool(id, &request).await),
            "ping" => Some(Response::result(id, json!({}))),
            method if request.is_notification() => {
                debug!("Received notification: {}", method);
                None
            }
            method => Some(Response::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method {} not implemented", method),
            )),
        }
    }

    async fn call_tool(&self, id: Value, request: &Request) -> Response {
        let name = request
            .param("name")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let Some(tool) = Tool::from_name(name) else {
            return Response::error(id, METHOD_NOT_FOUND, format!("Tool '{}' not found", name));
        };

        info!("Calling tool {}", tool.name());
        let result = tools::call(tool, &self.tools, request.param("arguments")).await;
        match result.to_value() {
            Ok(value) => Response::result(id, value),
            Err(e) => Response::error(id, rpc::INVALID_PARAMS, e.to_string()),
        }
    }

    /// Serve until `input` reaches end-of-file
    pub async fn serve<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let encoded = response.to_line()?;
            output.write_all(encoded.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }

        info!("stdin closed (EOF)");
        Ok(())
    }
}

/// Control-process entry: start the streaming child, serve stdio, stop the child.
///
/// A child that cannot be started is logged; the control channel still runs.
pub async fn run(config: AppConfig) -> Result<()> {
    let supervisor = config
        .tail_command()
        .and_then(|cmd| Supervisor::start(&cmd))
        .context("Failed to start streaming process")
        .ok()
        .map(|supervisor| {
            info!("Streaming process running (PID {:?})", supervisor.id());
            supervisor.with_grace(config.shutdown_grace())
        });

    let server = ControlServer::new(ToolContext::from_config(&config));
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let served = tokio::select! {
        result = server.serve(stdin, stdout) => result,
        _ = gdbs_core::signals::shutdown_requested() => Ok(()),
    };

    if let Some(supervisor) = supervisor {
        match supervisor.shutdown().await {
            Ok(code) => debug!("Streaming process stopped (code {:?})", code),
            Err(e) => warn!("Error stopping streaming process: {}", e),
        }
    }

    info!("Control channel exiting");
    served
}
