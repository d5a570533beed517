//! Control-channel tests over a real transcript
//!
//! Run with: cargo test --test control_channel

use std::time::Duration;

use gdb_streamer::{AppConfig, CliOverrides};
use gdbs_app::{ControlServer, Settings, ToolContext};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

const CRASH_SESSION: &str = include_str!("fixtures/crash_session.txt");

fn control_server(dir: &TempDir) -> ControlServer {
    let mut settings = Settings::default();
    settings.handshake.read_attempts = 1;
    settings.handshake.retry_delay_ms = 1;
    let config = AppConfig::from_settings(dir.path(), settings);
    ControlServer::new(ToolContext::from_config(&config))
}

async fn call(server: &ControlServer, id: u64, tool: &str, arguments: Value) -> Value {
    let line = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": tool, "arguments": arguments},
    })
    .to_string();
    let response = server.handle_line(&line).await.expect("no response");
    serde_json::from_str(&response.to_line().unwrap()).unwrap()
}

fn text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn test_explain_crash_session() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gdb.txt"), CRASH_SESSION).unwrap();
    let server = control_server(&dir);

    let response = call(&server, 1, "gdb-explain", json!({"detail_level": "detailed"})).await;
    assert_eq!(response["result"]["isError"], false);

    let report = text(&response);
    assert!(report.starts_with("## GDB Output Analysis\n"));
    assert!(report.contains("- **Executable**: `/home/dev/demo/demo`"));
    assert!(report.contains("- **Entry Point**: 0x1060"));
    assert!(report.contains("- **main()**: Assembly code was dumped for this function"));
    assert!(report.contains("- **Breakpoint #1**: Enabled"));
    assert!(report.contains("- **Breakpoint #2**: Disabled"));
    assert!(report.contains("- **Breakpoints Set**: 2"));
}

#[tokio::test]
async fn test_explain_focus_narrows_report() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gdb.txt"), CRASH_SESSION).unwrap();
    let server = control_server(&dir);

    let response = call(&server, 2, "gdb-explain", json!({"focus": "errors"})).await;
    let report = text(&response);
    assert!(report.contains("### ❌ Errors and Issues"));
    assert!(!report.contains("### 🎯 Breakpoints"));
}

#[tokio::test]
async fn test_file_tools_round_trip_through_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("gdb.txt");
    std::fs::write(&log, "one\ntwo\nthree\n").unwrap();
    let server = control_server(&dir);

    let tail = call(&server, 3, "gdb-read-file", json!({"lines": 2})).await;
    assert!(text(&tail).contains("two\nthree"));

    let refused = call(&server, 4, "gdb-clear-file", json!({})).await;
    assert_eq!(refused["result"]["isError"], true);
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "one\ntwo\nthree\n");

    let cleared = call(&server, 5, "gdb-clear-file", json!({"confirm": true})).await;
    assert_eq!(cleared["result"]["isError"], false);
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "");

    let info = call(&server, 6, "gdb-file-info", json!({})).await;
    assert!(text(&info).contains("Size: 0 bytes"));
}

#[tokio::test]
async fn test_missing_transcript_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let server = control_server(&dir);

    for (id, tool) in [(7, "gdb-read-file"), (8, "gdb-explain")] {
        let response = call(&server, id, tool, json!({})).await;
        assert!(response.get("error").is_none(), "{tool} returned an RPC error");
        assert_eq!(response["result"]["isError"], true);
        assert!(text(&response).contains("does not exist"));
    }
}

#[tokio::test]
async fn test_cli_file_override_is_anchored_at_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("session.log"), CRASH_SESSION).unwrap();

    let config = AppConfig::load(
        dir.path(),
        &CliOverrides {
            file: Some("session.log".into()),
            ..Default::default()
        },
    );
    let server = ControlServer::new(ToolContext::from_config(&config));

    let response = call(&server, 9, "gdb-file-info", json!({})).await;
    assert_eq!(response["result"]["isError"], false);
    assert!(text(&response).contains("session.log"));
}

#[tokio::test]
async fn test_serve_session_over_pipes() {
    let dir = tempfile::tempdir().unwrap();
    let server = control_server(&dir);
    let (client, server_io) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server_io);
    let (client_read, mut client_write) = tokio::io::split(client);

    let serving = tokio::spawn(async move {
        server
            .serve(tokio::io::BufReader::new(server_read), server_write)
            .await
    });

    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n")
        .await
        .unwrap();
    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
        .await
        .unwrap();
    client_write
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"gdb-tail\"}}\n")
        .await
        .unwrap();

    let mut lines = tokio::io::BufReader::new(client_read).lines();
    let first: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(first["id"], 1);
    assert_eq!(first["result"]["serverInfo"]["name"], "gdb-streamer");

    let second: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(second["id"], 2);
    assert!(text(&second).starts_with("WebSocket server is running on ws://127.0.0.1:8765."));

    // Closing the write side is the client's EOF
    client_write.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
