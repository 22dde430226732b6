use super::event::LogEvent;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Errors raised while talking to the log service
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("log service answered {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed log event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("event stream transport error: {0}")]
    Transport(String),
}

/// What to do with a frame whose payload is not a valid log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Log a warning and skip the frame
    #[default]
    Drop,
    /// Log an error and end the stream
    Strict,
}

impl FromStr for DecodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(DecodePolicy::Drop),
            "strict" => Ok(DecodePolicy::Strict),
            other => Err(format!("Invalid decode policy '{}'. Use 'drop' or 'strict'", other)),
        }
    }
}

impl fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodePolicy::Drop => write!(f, "drop"),
            DecodePolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Why a pump stopped forwarding events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// The server closed the stream or the transport failed
    Ended,
    /// The handle was closed
    Cancelled,
    /// Nobody is listening any more
    ReceiverGone,
    /// A malformed frame was met under [`DecodePolicy::Strict`]
    DecodeFailed,
}

/// Decodes the data payload of one server-pushed frame
pub fn decode_event(data: &str) -> Result<LogEvent, StreamError> {
    Ok(serde_json::from_str(data)?)
}

// Unnamed frames arrive as "message"; named ones are not log events
fn is_message_frame(event_type: &str) -> bool {
    event_type.is_empty() || event_type == "message"
}

/// Reads an SSE byte stream, decodes each frame and forwards the events in
/// arrival order until the stream ends, `cancel` fires or `tx` is dropped.
pub async fn pump_events<S, B, E>(
    bytes: S,
    policy: DecodePolicy,
    tx: &mpsc::Sender<LogEvent>,
    cancel: &CancellationToken,
) -> PumpOutcome
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let mut frames = Box::pin(bytes.eventsource());
    let mut delivered = 0usize;

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("STREAM: Cancelled after {} events", delivered);
                return PumpOutcome::Cancelled;
            }
            frame = frames.next() => frame,
        };

        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                let e = StreamError::Transport(e.to_string());
                warn!("STREAM: {} (after {} events)", e, delivered);
                return PumpOutcome::Ended;
            }
            None => {
                info!("STREAM: Server closed the stream after {} events", delivered);
                return PumpOutcome::Ended;
            }
        };

        if !is_message_frame(&frame.event) {
            trace!("STREAM: Skipping '{}' frame", frame.event);
            continue;
        }
        if frame.data.trim().is_empty() {
            trace!("STREAM: Skipping empty frame");
            continue;
        }

        let event = match decode_event(&frame.data) {
            Ok(event) => event,
            Err(e) => match policy {
                DecodePolicy::Drop => {
                    warn!("STREAM: Dropping frame: {}", e);
                    continue;
                }
                DecodePolicy::Strict => {
                    error!("STREAM: {} in frame {:?}", e, frame.data);
                    return PumpOutcome::DecodeFailed;
                }
            },
        };

        trace!("STREAM: Decoded event #{} from {} to {}", event.sequence_id, event.sender, event.receiver);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PumpOutcome::Cancelled,
            sent = tx.send(event) => {
                if sent.is_err() {
                    debug!("STREAM: Receiver dropped, stopping");
                    return PumpOutcome::ReceiverGone;
                }
            }
        }
        delivered += 1;
    }
}
