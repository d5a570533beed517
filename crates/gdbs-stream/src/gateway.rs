//! Connection gateway: one listener, two protocols.
//!
//! Every accepted socket gets its own task. The request head is read by hand;
//! a WebSocket upgrade is completed in place and handed to a tail
//! subscription, anything else receives the JSON status document and is
//! closed.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use gdbs_core::prelude::*;
use gdbs_core::LogFile;

use crate::port::bind_socket;
use crate::protocol::{stream_url, StatusDocument, StreamMessage};
use crate::tail::{self, TailOptions};

/// Pending frames per subscriber before its tail pauses
const SUBSCRIBER_BUFFER: usize = 256;

/// Upper bound on request head lines accepted
const MAX_HEAD_LINES: usize = 100;

/// Upper bound on request head bytes accepted, across all lines
const MAX_HEAD_BYTES: u64 = 16 * 1024;

/// Time allowed for a client to send its request head
const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

const LISTEN_BACKLOG: u32 = 128;

type Connection = BufReader<TcpStream>;

/// Shared, read-only state for all connections
#[derive(Debug)]
struct GatewayContext {
    tail: TailOptions,
    log_file: LogFile,
    advertised_url: String,
}

/// Bound listener ready to serve
pub struct Gateway {
    listener: TcpListener,
    context: Arc<GatewayContext>,
}

impl Gateway {
    /// Bind `addr` with address reuse, the same way ports are probed.
    ///
    /// The advertised URL uses the port actually bound, so binding port 0
    /// advertises the ephemeral port.
    pub fn bind(addr: SocketAddr, tail: TailOptions) -> Result<Self> {
        let listener = bind_socket(addr)
            .and_then(|socket| socket.listen(LISTEN_BACKLOG))
            .map_err(|e| Error::bind(addr.to_string(), e.to_string()))?;
        let advertised_url = stream_url("localhost", listener.local_addr()?.port())?;

        let log_file = LogFile::new(&tail.path);
        Ok(Self {
            listener,
            context: Arc::new(GatewayContext {
                tail,
                log_file,
                advertised_url: advertised_url.to_string(),
            }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn advertised_url(&self) -> &str {
        &self.context.advertised_url
    }

    /// Accept connections until `shutdown` resolves
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Gateway shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let context = Arc::clone(&self.context);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, peer, context).await {
                                    debug!("Connection from {} ended with error: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => warn!("Failed to accept connection: {}", e),
                    }
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request head
// ─────────────────────────────────────────────────────────────────────────────

/// Request line and headers of an HTTP/1.1 request
#[derive(Debug, Default)]
struct RequestHead {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    fn parse<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut lines = lines.into_iter();
        let request_line = lines
            .next()
            .ok_or_else(|| Error::protocol("empty request"))?;
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or("/").to_string();
        if method.is_empty() {
            return Err(Error::protocol("missing request method"));
        }

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();

        Ok(Self {
            method,
            path,
            headers,
        })
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn header_contains(&self, name: &str, token: &str) -> bool {
        self.header(name).is_some_and(|value| {
            value
                .split(',')
                .any(|part| part.trim().eq_ignore_ascii_case(token))
        })
    }

    fn is_websocket_upgrade(&self) -> bool {
        self.header_contains("upgrade", "websocket") && self.header_contains("connection", "upgrade")
    }
}

async fn read_request_head<R>(conn: &mut R) -> Result<RequestHead>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = (&mut *conn).take(MAX_HEAD_BYTES);
    let mut lines = Vec::new();

    loop {
        let mut line = String::new();
        let read = limited.read_line(&mut line).await?;
        if limited.limit() == 0 && !line.ends_with('\n') {
            return Err(Error::protocol("request head too large"));
        }
        if read == 0 {
            return Err(Error::protocol("connection closed during request head"));
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if line.is_empty() {
            if lines.is_empty() {
                // Tolerate stray CRLF before the request line
                continue;
            }
            break;
        }
        if lines.len() >= MAX_HEAD_LINES {
            return Err(Error::protocol("request head too large"));
        }
        lines.push(line);
    }

    RequestHead::parse(lines.iter().map(String::as_str))
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection handling
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_connection(stream: TcpStream, peer: SocketAddr, context: Arc<GatewayContext>) -> Result<()> {
    let mut conn = BufReader::new(stream);
    let head = tokio::time::timeout(HEAD_TIMEOUT, read_request_head(&mut conn))
        .await
        .map_err(|_| Error::protocol("timed out waiting for request head"))??;

    if !head.is_websocket_upgrade() {
        debug!("HTTP {} {} from {}", head.method, head.path, peer);
        return respond_status(conn, &context).await;
    }

    let Some(key) = head.header("sec-websocket-key") else {
        respond(&mut conn, "400 Bad Request", "text/plain", b"Missing Sec-WebSocket-Key").await?;
        return Err(Error::protocol("upgrade request without Sec-WebSocket-Key"));
    };
    let accept = derive_accept_key(key.as_bytes());
    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {accept}\r\n\r\n"
    );
    conn.write_all(response.as_bytes()).await?;
    conn.flush().await?;

    let ws = WebSocketStream::from_raw_socket(conn, Role::Server, None).await;
    info!("[WS] Client connected: {} path={}", peer, head.path);
    let outcome = serve_subscriber(ws, peer, &context).await;
    info!("[WS] Client disconnected: {}", peer);
    outcome
}

async fn respond_status(mut conn: Connection, context: &GatewayContext) -> Result<()> {
    let body = StatusDocument::snapshot(&context.log_file, &context.advertised_url).to_json_pretty()?;
    respond(&mut conn, "200 OK", "application/json", body.as_bytes()).await?;
    conn.shutdown().await?;
    Ok(())
}

async fn respond(conn: &mut Connection, status: &str, content_type: &str, body: &[u8]) -> Result<()> {
    let head = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        body.len()
    );
    conn.write_all(head.as_bytes()).await?;
    conn.write_all(body).await?;
    conn.flush().await?;
    Ok(())
}

/// How a subscriber's connection ended
#[derive(Debug)]
enum Closed {
    /// Tail finished (error frame sent) and the close handshake was started
    TailEnded,
    /// Peer sent a close frame or the stream ended
    ByPeer,
    /// Transport failure
    Failed(String),
}

async fn serve_subscriber(ws: WebSocketStream<Connection>, peer: SocketAddr, context: &GatewayContext) -> Result<()> {
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::channel::<StreamMessage>(SUBSCRIBER_BUFFER);

    let options = context.tail.clone();
    let tail_task = tokio::spawn(async move { tail::run_subscription(&options, tx).await });

    let forward = async move {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => return Closed::Failed(e.to_string()),
            };
            if let Err(e) = sink.send(Message::text(text)).await {
                return Closed::Failed(e.to_string());
            }
        }
        let _ = sink.close().await;
        Closed::TailEnded
    };

    let watch = async {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Close(_)) => return Closed::ByPeer,
                Ok(_) => {}
                Err(e) => return Closed::Failed(e.to_string()),
            }
        }
        Closed::ByPeer
    };

    let closed = tokio::select! {
        closed = forward => closed,
        closed = watch => closed,
    };

    // The receiver is gone once `forward` is dropped; abort covers a tail
    // parked in a throttle sleep.
    tail_task.abort();

    match closed {
        Closed::TailEnded => {
            debug!("[WS] Subscription for {} ended by tail", peer);
            Ok(())
        }
        Closed::ByPeer => {
            info!("[WS] Connection closed cleanly by client: {}", peer);
            Ok(())
        }
        Closed::Failed(reason) => {
            warn!("[WS] Connection closed with error from client {}: {}", peer, reason);
            Err(Error::websocket(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upgrade_request() {
        let head = RequestHead::parse([
            "GET / HTTP/1.1",
            "Host: localhost:8765",
            "Upgrade: websocket",
            "Connection: keep-alive, Upgrade",
            "Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==",
        ])
        .unwrap();

        assert_eq!(head.method, "GET");
        assert_eq!(head.path, "/");
        assert!(head.is_websocket_upgrade());
        assert_eq!(
            head.header("Sec-WebSocket-Key"),
            Some("dGhlIHNhbXBsZSBub25jZQ==")
        );
    }

    #[test]
    fn test_plain_request_is_not_upgrade() {
        let head = RequestHead::parse(["GET /status HTTP/1.1", "Host: localhost"]).unwrap();
        assert!(!head.is_websocket_upgrade());
        assert_eq!(head.path, "/status");
    }

    #[test]
    fn test_upgrade_header_without_connection_upgrade() {
        let head = RequestHead::parse(["GET / HTTP/1.1", "Upgrade: websocket", "Connection: close"]).unwrap();
        assert!(!head.is_websocket_upgrade());
    }

    #[test]
    fn test_empty_request_is_rejected() {
        assert!(RequestHead::parse(Vec::<&str>::new()).is_err());
    }

    #[tokio::test]
    async fn test_read_request_head_from_bytes() {
        let raw = b"\r\nGET /status HTTP/1.1\r\nHost: localhost\r\n\r\nleftover";
        let mut input: &[u8] = raw;

        let head = read_request_head(&mut input).await.unwrap();
        assert_eq!(head.path, "/status");
        assert_eq!(head.header("host"), Some("localhost"));
        assert_eq!(input, b"leftover");
    }

    #[tokio::test]
    async fn test_oversized_header_line_is_rejected() {
        let mut raw = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(MAX_HEAD_BYTES as usize * 4));
        raw.extend_from_slice(b"\r\n\r\n");
        let mut input: &[u8] = &raw;

        let err = read_request_head(&mut input).await.unwrap_err();
        assert_eq!(err.to_string(), "Protocol error: request head too large");
        // Reading stopped at the cap
        assert!(input.len() >= raw.len() - MAX_HEAD_BYTES as usize);
    }

    #[tokio::test]
    async fn test_truncated_head_is_connection_closed() {
        let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: loc";
        let err = read_request_head(&mut input).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Protocol error: connection closed during request head"
        );
    }

    #[test]
    fn test_accept_key_matches_rfc_sample() {
        assert_eq!(
            derive_accept_key(b"dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaOKdSQ0/4u3a91KxY="
        );
    }
}
