mod common;

use common::{hop, pipeline, serve_once, sse_frame, B1};
use hoplog::session::{LifecycleCoordinator, SessionState, SessionUpdate, ViewerStatus};
use hoplog::stream::{DecodePolicy, EventStreamClient, LogStreamConnector, StreamSettings};
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn client(base_url: &str, policy: DecodePolicy) -> EventStreamClient {
    EventStreamClient::new(StreamSettings {
        log_api_url: base_url.to_string(),
        connect_timeout: Duration::from_secs(2),
        decode_policy: policy,
        channel_capacity: 16,
    })
    .expect("client builds")
}

#[tokio::test]
async fn test_stream_requests_broadcast_endpoint() {
    let (url, request) = serve_once("200 OK", vec![sse_frame(&hop(B1, 1, "Threat Service", "User Service"))], false).await;
    let client = client(&url, DecodePolicy::Drop);

    let mut handle = client.open(B1).expect("handle for non-empty id");
    let event = timeout(WAIT, handle.recv()).await.unwrap().expect("one event");
    assert_eq!(event.sequence_id, 1);
    assert_eq!(event.broadcast_id, B1);

    let request_line = timeout(WAIT, request).await.unwrap().unwrap();
    assert_eq!(request_line, format!("GET /api/v1/log/{} HTTP/1.1", B1));

    // Server closed the connection: silent end of stream
    assert!(timeout(WAIT, handle.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_viewer_follows_pipeline_to_delivery() {
    let frames = pipeline(B1).iter().map(sse_frame).collect();
    let (url, _request) = serve_once("200 OK", frames, true).await;
    let mut coordinator = LifecycleCoordinator::new(client(&url, DecodePolicy::Drop));

    coordinator.observe(B1);
    let mut updates = Vec::new();
    while coordinator.is_streaming() {
        updates.push(timeout(WAIT, coordinator.next_update()).await.unwrap());
    }

    assert_eq!(updates.len(), 3);
    assert!(matches!(updates[2], SessionUpdate::Completed(_)));
    assert_eq!(coordinator.state(), Some(SessionState::Completed));
    assert_eq!(coordinator.log().len(), 3);
    assert_eq!(coordinator.status(), ViewerStatus::Delivered);
    assert_eq!(coordinator.history(B1).len(), 3);
}

#[tokio::test]
async fn test_malformed_frame_dropped() {
    let frames = vec![
        sse_frame(&hop(B1, 1, "Threat Service", "User Service")),
        "data: {\"oops\": true}\n\n".to_string(),
        sse_frame(&hop(B1, 2, "User Service", "Messaging BB")),
    ];
    let (url, _request) = serve_once("200 OK", frames, false).await;
    let client = client(&url, DecodePolicy::Drop);

    let mut handle = client.open(B1).unwrap();
    let mut ids = Vec::new();
    while let Some(event) = timeout(WAIT, handle.recv()).await.unwrap() {
        ids.push(event.sequence_id);
    }
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_malformed_frame_ends_strict_stream() {
    let frames = vec![
        sse_frame(&hop(B1, 1, "Threat Service", "User Service")),
        "data: {\"oops\": true}\n\n".to_string(),
        sse_frame(&hop(B1, 2, "User Service", "Messaging BB")),
    ];
    let (url, _request) = serve_once("200 OK", frames, true).await;
    let client = client(&url, DecodePolicy::Strict);

    let mut handle = client.open(B1).unwrap();
    assert_eq!(timeout(WAIT, handle.recv()).await.unwrap().unwrap().sequence_id, 1);
    assert!(timeout(WAIT, handle.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_error_status_is_silent_end() {
    let (url, _request) = serve_once("404 Not Found", vec![], false).await;
    let mut coordinator = LifecycleCoordinator::new(client(&url, DecodePolicy::Drop));

    coordinator.observe(B1);
    let update = timeout(WAIT, coordinator.next_update()).await.unwrap();

    assert_eq!(update, SessionUpdate::StreamEnded);
    assert_eq!(coordinator.log().len(), 1);
    assert_eq!(coordinator.status(), ViewerStatus::Processing);
}

#[tokio::test]
async fn test_close_while_connected() {
    let frames = vec![sse_frame(&hop(B1, 1, "Threat Service", "User Service"))];
    let (url, _request) = serve_once("200 OK", frames, true).await;
    let client = client(&url, DecodePolicy::Drop);

    let mut handle = client.open(B1).unwrap();
    assert!(timeout(WAIT, handle.recv()).await.unwrap().is_some());

    handle.close();
    handle.close();
    assert!(handle.is_closed());
    assert!(timeout(WAIT, handle.recv()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unreachable_service_is_silent_end() {
    // Nothing listens on port 9 of the loopback interface
    let client = client("http://127.0.0.1:9", DecodePolicy::Drop);
    let mut handle = client.open(B1).unwrap();
    assert!(timeout(WAIT, handle.recv()).await.unwrap().is_none());
}
