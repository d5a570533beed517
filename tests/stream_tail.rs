//! Streaming server and control channel working from one configuration
//!
//! Run with: cargo test --test stream_tail

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use gdb_streamer::AppConfig;
use gdbs_app::{ControlServer, Settings, ToolContext};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

fn append(path: &Path, text: &str) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

fn config(dir: &Path) -> AppConfig {
    let mut settings = Settings::default();
    settings.server.host = "127.0.0.1".to_string();
    settings.server.port = 0;
    settings.server.max_port_attempts = 1;
    settings.server.idle_poll_ms = 10;
    settings.handshake.read_attempts = 200;
    settings.handshake.retry_delay_ms = 10;
    AppConfig::from_settings(dir, settings)
}

async fn advertised_uri(server: &ControlServer) -> String {
    let request = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"gdb-tail","arguments":{}}}"#;
    let response = server.handle_line(request).await.unwrap();
    let value: Value = serde_json::from_str(&response.to_line().unwrap()).unwrap();
    let text = value["result"]["content"][0]["text"].as_str().unwrap();

    let start = text.find("ws://").unwrap();
    let end = start + text[start..].find(".\n").unwrap();
    text[start..end].to_string()
}

async fn next_frame<S>(stream: &mut S) -> Value
where
    S: futures_util::Stream<Item = tokio_tungstenite::tungstenite::Result<Message>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_tail_tool_points_at_live_stream() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("gdb.txt");
    append(&log, "(gdb) file ./demo\n");
    let config = config(dir.path());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let streaming = tokio::spawn(gdbs_stream::run(config.stream_config(), async {
        let _ = stop_rx.await;
    }));

    let server = ControlServer::new(ToolContext::from_config(&config));
    let uri = advertised_uri(&server).await;
    assert_ne!(uri, "ws://127.0.0.1:0");

    let (mut ws, _) = tokio_tungstenite::connect_async(uri.as_str()).await.unwrap();

    let meta = next_frame(&mut ws).await;
    assert_eq!(meta["type"], "meta");
    assert_eq!(meta["filename"], "gdb.txt");
    assert_eq!(meta["size"], 18);

    append(&log, "(gdb) run\nProgram received signal SIGSEGV, Segmentation fault.\n");
    assert_eq!(next_frame(&mut ws).await["data"], "(gdb) run");
    assert_eq!(
        next_frame(&mut ws).await["data"],
        "Program received signal SIGSEGV, Segmentation fault."
    );

    drop(ws);
    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), streaming)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!config.handshake_path().exists());
}

#[tokio::test]
async fn test_two_subscribers_see_the_same_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("gdb.txt");
    append(&log, "");
    let config = config(dir.path());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    tokio::spawn(gdbs_stream::run(config.stream_config(), async {
        let _ = stop_rx.await;
    }));

    let server = ControlServer::new(ToolContext::from_config(&config));
    let uri = advertised_uri(&server).await;

    let (mut first, _) = tokio_tungstenite::connect_async(uri.as_str()).await.unwrap();
    let (mut second, _) = tokio_tungstenite::connect_async(uri.as_str()).await.unwrap();
    assert_eq!(next_frame(&mut first).await["type"], "meta");
    assert_eq!(next_frame(&mut second).await["type"], "meta");

    append(&log, "Breakpoint 1, main () at demo.c:5\n");
    assert_eq!(next_frame(&mut first).await["data"], "Breakpoint 1, main () at demo.c:5");
    assert_eq!(next_frame(&mut second).await["data"], "Breakpoint 1, main () at demo.c:5");

    let _ = stop_tx.send(());
}
