use gdbs_core::prelude::*;
use gdbs_core::PortSource;

use super::ToolContext;
use crate::rpc::ToolResult;

/// Point the client at the streaming endpoint
pub(super) async fn gdb_tail(context: &ToolContext) -> Result<ToolResult> {
    let resolved = context.handshake.read().await;
    if resolved.source == PortSource::Fallback {
        warn!(
            "No port record at {}, advertising configured port {}",
            context.handshake.path().display(),
            resolved.port
        );
    }

    let connect_uri = format!("ws://127.0.0.1:{}", resolved.port);
    Ok(ToolResult::text(format!(
        "WebSocket server is running on {connect_uri}.\n\n\
         Connect to this URI to stream {} file updates in real-time. \
         The server will send new lines as they are appended to the file.",
        context.log_file.name()
    )))
}
