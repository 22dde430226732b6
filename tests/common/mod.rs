//! Shared helpers for the integration tests
//!
//! - event builders with the log service's field values
//! - SSE frame encoding
//! - a one-shot local HTTP server speaking `text/event-stream`

#![allow(dead_code)]

use hoplog::stream::LogEvent;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const B1: &str = "0d7f3f4e-8b6a-4c4e-9a54-3f1c2b7a9e10";
pub const B2: &str = "5b2c9e61-1f0a-4d3b-8e77-a04c6d2f8b31";

/// A hop as the log service would send it
pub fn hop(broadcast: &str, id: i64, sender: &str, receiver: &str) -> LogEvent {
    LogEvent {
        sequence_id: id,
        content: format!("{} handed the alert to {}", sender, receiver),
        timestamp: format!("2024-10-01T12:00:{:02}.000", id),
        broadcast_id: broadcast.to_string(),
        sender: sender.to_string(),
        receiver: receiver.to_string(),
        processed: true,
    }
}

/// The usual pipeline: threat service → mediator → messaging → device
pub fn pipeline(broadcast: &str) -> Vec<LogEvent> {
    vec![
        hop(broadcast, 1, "Threat Service", "Information Mediator BB"),
        hop(broadcast, 2, "Information Mediator BB", "Messaging BB"),
        hop(broadcast, 3, "Messaging BB", "mobile"),
    ]
}

pub fn sse_frame(event: &LogEvent) -> String {
    format!("data: {}\n\n", serde_json::to_string(event).expect("event serializes"))
}

/// Serves a single request and answers with `status` followed by `frames`.
/// With `hold_open` the connection stays up after the last frame.
/// Returns the base URL and the request line the client sent.
pub async fn serve_once(
    status: &'static str,
    frames: Vec<String>,
    hold_open: bool,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");
    let (request_tx, request_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.expect("read request");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        let request = String::from_utf8_lossy(&request).to_string();
        let request_line = request.lines().next().unwrap_or_default().to_string();
        let _ = request_tx.send(request_line);

        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n",
            status
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for frame in frames {
            if socket.write_all(frame.as_bytes()).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
        }
        if hold_open {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    });

    (format!("http://{}", addr), request_rx)
}
