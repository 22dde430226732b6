use super::decode::{pump_events, DecodePolicy, PumpOutcome, StreamError};
use super::event::LogEvent;
use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection settings for the log service
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub log_api_url: String,
    pub connect_timeout: Duration,
    pub decode_policy: DecodePolicy,
    pub channel_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            log_api_url: "http://localhost:8080".to_string(),
            connect_timeout: Duration::from_secs(10),
            decode_policy: DecodePolicy::Drop,
            channel_capacity: 256,
        }
    }
}

/// Owned handle to one live log stream.
///
/// Events are delivered in transport order through [`StreamHandle::recv`].
/// Closing is idempotent and also happens on drop; once closed, `recv`
/// yields nothing, including events that were already buffered.
#[derive(Debug)]
pub struct StreamHandle {
    broadcast_id: String,
    events: mpsc::Receiver<LogEvent>,
    cancel: CancellationToken,
}

impl StreamHandle {
    pub fn new(broadcast_id: &str, events: mpsc::Receiver<LogEvent>, cancel: CancellationToken) -> Self {
        Self {
            broadcast_id: broadcast_id.to_string(),
            events,
            cancel,
        }
    }

    /// Creates a handle fed by the returned sender instead of a connection
    pub fn channel(broadcast_id: &str, capacity: usize) -> (mpsc::Sender<LogEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(broadcast_id, rx, CancellationToken::new()))
    }

    pub fn broadcast_id(&self) -> &str {
        &self.broadcast_id
    }

    /// Waits for the next event. `None` once the stream ended or was closed.
    pub async fn recv(&mut self) -> Option<LogEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    pub fn close(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        debug!("STREAM: Closing stream for broadcast {}", self.broadcast_id);
        self.cancel.cancel();
        self.events.close();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Anything able to open a log stream for a broadcast
pub trait LogStreamConnector: Send + Sync {
    /// Opens a stream, or returns `None` when no stream can exist for the id
    fn open(&self, broadcast_id: &str) -> Option<StreamHandle>;
}

impl<T: LogStreamConnector + ?Sized> LogStreamConnector for Arc<T> {
    fn open(&self, broadcast_id: &str) -> Option<StreamHandle> {
        (**self).open(broadcast_id)
    }
}

/// Subscribes to the log service's server-push endpoint
#[derive(Debug, Clone)]
pub struct EventStreamClient {
    http: reqwest::Client,
    settings: StreamSettings,
}

impl EventStreamClient {
    pub fn new(settings: StreamSettings) -> Result<Self> {
        info!("STREAM: Creating client for {}", settings.log_api_url);
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// URL of the log stream for a broadcast
    pub fn endpoint(&self, broadcast_id: &str) -> String {
        format!(
            "{}/api/v1/log/{}",
            self.settings.log_api_url.trim_end_matches('/'),
            broadcast_id
        )
    }

    async fn connect(
        http: reqwest::Client,
        url: String,
        policy: DecodePolicy,
        tx: mpsc::Sender<LogEvent>,
        cancel: CancellationToken,
    ) -> Result<PumpOutcome, StreamError> {
        let request = http.get(&url).header(ACCEPT, "text/event-stream").send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(PumpOutcome::Cancelled),
            response = request => response.map_err(|source| StreamError::Request {
                url: url.clone(),
                source,
            })?,
        };

        if !response.status().is_success() {
            return Err(StreamError::Status {
                url,
                status: response.status(),
            });
        }

        info!("STREAM: Connected to {}", url);
        Ok(pump_events(response.bytes_stream(), policy, &tx, &cancel).await)
    }
}

impl LogStreamConnector for EventStreamClient {
    fn open(&self, broadcast_id: &str) -> Option<StreamHandle> {
        let broadcast_id = broadcast_id.trim();
        if broadcast_id.is_empty() {
            debug!("STREAM: No broadcast id, not opening a stream");
            return None;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("STREAM: Cannot open stream for {} outside a runtime: {}", broadcast_id, e);
                return None;
            }
        };

        let url = self.endpoint(broadcast_id);
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity.max(1));
        let cancel = CancellationToken::new();

        let http = self.http.clone();
        let policy = self.settings.decode_policy;
        let task_cancel = cancel.clone();
        let task_id = broadcast_id.to_string();

        runtime.spawn(async move {
            debug!("STREAM_TASK: Opening {}", url);
            match Self::connect(http, url, policy, tx, task_cancel).await {
                Ok(outcome) => debug!("STREAM_TASK: Stream for {} stopped: {:?}", task_id, outcome),
                // Transport failures end the stream silently for the viewer
                Err(e @ StreamError::Status { .. }) => warn!("STREAM_TASK: {}", e),
                Err(e) => error!("STREAM_TASK: {}", e),
            }
        });

        Some(StreamHandle::new(broadcast_id, rx, cancel))
    }
}
