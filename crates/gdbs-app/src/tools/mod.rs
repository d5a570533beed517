//! Tool catalogue and dispatch for `tools/call`
//!
//! Handlers return `Result<ToolResult>`. Expected failures (missing file,
//! missing confirmation) come back as `Ok` error results with their own
//! wording; anything propagated with `?` is turned into an error result here,
//! so a failing tool never takes the control channel down.

mod explain;
mod file;
mod tail;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use gdbs_core::prelude::*;
use gdbs_core::{HandshakeStore, LogFile};

use crate::config::AppConfig;
use crate::rpc::ToolResult;

/// Tools advertised by `tools/list`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Tail,
    ReadFile,
    FileInfo,
    ClearFile,
    Explain,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Tail,
        Tool::ReadFile,
        Tool::FileInfo,
        Tool::ClearFile,
        Tool::Explain,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Tail => "gdb-tail",
            Tool::ReadFile => "gdb-read-file",
            Tool::FileInfo => "gdb-file-info",
            Tool::ClearFile => "gdb-clear-file",
            Tool::Explain => "gdb-explain",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::Tail => "Start streaming the gdb.txt file. Returns a WebSocket URI to connect to for real-time file updates.",
            Tool::ReadFile => "Read the entire gdb.txt file content.",
            Tool::FileInfo => "Get information about the gdb.txt file (size, exists, last modified).",
            Tool::ClearFile => "Clear the contents of the gdb.txt file.",
            Tool::Explain => "Analyze and explain the GDB output in simple language with technical findings. Perfect for intermediate and new debugger users.",
        }
    }

    pub fn input_schema(&self) -> Value {
        match self {
            Tool::Tail => json!({
                "type": "object",
                "properties": {
                    "batch_size": {
                        "type": "integer",
                        "description": "Number of lines to batch before sending (not used, for future)",
                        "default": 20
                    },
                    "interval": {
                        "type": "number",
                        "description": "Interval in seconds between batches (not used, for future)",
                        "default": 3.0
                    }
                }
            }),
            Tool::ReadFile => json!({
                "type": "object",
                "properties": {
                    "lines": {
                        "type": "integer",
                        "description": "Number of lines to read from the end (0 = read all)",
                        "default": 0
                    }
                }
            }),
            Tool::FileInfo => json!({
                "type": "object",
                "properties": {}
            }),
            Tool::ClearFile => json!({
                "type": "object",
                "properties": {
                    "confirm": {
                        "type": "boolean",
                        "description": "Set to true to confirm clearing the file",
                        "default": false
                    }
                },
                "required": ["confirm"]
            }),
            Tool::Explain => json!({
                "type": "object",
                "properties": {
                    "detail_level": {
                        "type": "string",
                        "enum": ["simple", "intermediate", "detailed"],
                        "description": "Level of detail in the explanation (simple=basic, intermediate=moderate detail, detailed=comprehensive)",
                        "default": "intermediate"
                    },
                    "focus": {
                        "type": "string",
                        "enum": ["all", "errors", "breakpoints", "assembly", "execution"],
                        "description": "What to focus on in the analysis",
                        "default": "all"
                    }
                }
            }),
        }
    }

    /// Prefix for errors that escape the handler
    fn failure_prefix(&self) -> &'static str {
        match self {
            Tool::Tail => "Error resolving stream address",
            Tool::ReadFile => "Error reading file",
            Tool::FileInfo => "Error getting file info",
            Tool::ClearFile => "Error clearing file",
            Tool::Explain => "Error analyzing GDB output",
        }
    }

    pub fn descriptor(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

/// Result of `tools/list`
pub fn catalogue() -> Value {
    json!({
        "tools": Tool::ALL.iter().map(Tool::descriptor).collect::<Vec<_>>()
    })
}

/// What the handlers operate on
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub log_file: LogFile,
    pub handshake: HandshakeStore,
}

impl ToolContext {
    pub fn new(log_file: LogFile, handshake: HandshakeStore) -> Self {
        Self {
            log_file,
            handshake,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.log_file(), config.handshake_store())
    }
}

/// Run `tool` with `arguments`; never fails
pub async fn call(tool: Tool, context: &ToolContext, arguments: Option<&Value>) -> ToolResult {
    let outcome = match tool {
        Tool::Tail => tail::gdb_tail(context).await,
        Tool::ReadFile => parse_args(arguments).and_then(|args| file::read_file(context, args)),
        Tool::FileInfo => file::file_info(context),
        Tool::ClearFile => parse_args(arguments).and_then(|args| file::clear_file(context, args)),
        Tool::Explain => parse_args(arguments).and_then(|args| explain::explain(context, args)),
    };

    match outcome {
        Ok(result) => result,
        Err(e) => {
            if e.is_recoverable() {
                warn!("Tool {} failed: {}", tool.name(), e);
            } else {
                error!("Tool {} failed: {}", tool.name(), e);
            }
            ToolResult::error(format!("{}: {}", tool.failure_prefix(), e))
        }
    }
}

/// Deserialize tool arguments, treating a missing or non-object value as `{}`
fn parse_args<T: DeserializeOwned>(arguments: Option<&Value>) -> Result<T> {
    let value = match arguments {
        Some(value @ Value::Object(_)) => value.clone(),
        _ => json!({}),
    };
    serde_json::from_value(value).map_err(|e| Error::protocol(format!("invalid arguments: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    pub(super) fn context(dir: &TempDir) -> ToolContext {
        ToolContext::new(
            LogFile::new(dir.path().join("gdb.txt")),
            HandshakeStore::new(dir.path().join(".ws_port"), 8765)
                .with_retry(2, Duration::from_millis(1)),
        )
    }

    #[test]
    fn test_catalogue_lists_five_tools_in_order() {
        let list = catalogue();
        let names: Vec<&str> = list["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["gdb-tail", "gdb-read-file", "gdb-file-info", "gdb-clear-file", "gdb-explain"]
        );
        assert_eq!(list["tools"][3]["inputSchema"]["required"], json!(["confirm"]));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Tool::from_name("gdb-explain"), Some(Tool::Explain));
        assert_eq!(Tool::from_name("gdb-nope"), None);
    }

    #[tokio::test]
    async fn test_bad_arguments_become_error_result() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gdb.txt"), "x\n").unwrap();

        let result = call(
            Tool::ReadFile,
            &context(&dir),
            Some(&json!({"lines": "many"})),
        )
        .await;
        assert!(result.is_error);
        assert!(result.joined_text().starts_with("Error reading file: "));
    }

    #[tokio::test]
    async fn test_missing_arguments_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gdb.txt"), "a\nb\n").unwrap();

        let result = call(Tool::ReadFile, &context(&dir), None).await;
        assert!(!result.is_error);
        assert!(result.joined_text().starts_with("Full content of gdb.txt (2 lines):"));
    }
}
