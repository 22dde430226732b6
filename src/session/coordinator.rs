use super::accumulator::{Ingested, LogAccumulator, SessionState};
use crate::routing::{self, Route};
use crate::stream::{LogEvent, LogStreamConnector, StreamHandle};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// What [`LifecycleCoordinator::next_update`] observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A hop was appended to the log
    Appended(LogEvent),
    /// The final event arrived and the stream was closed
    Completed(LogEvent),
    /// An event arrived but was not accepted into state
    Ignored,
    /// The server or transport ended the stream before completion
    StreamEnded,
    /// No live stream to wait on
    Idle,
}

/// One-line status shown next to the device view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerStatus {
    NotInitiated,
    Processing,
    Delivered,
}

impl fmt::Display for ViewerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerStatus::NotInitiated => {
                write!(f, "Broadcast is not initiated! User hasn't received a message yet.")
            }
            ViewerStatus::Processing => write!(f, "Processing..."),
            ViewerStatus::Delivered => write!(f, "Broadcast is sent! User has received the message."),
        }
    }
}

struct Session {
    accumulator: LogAccumulator,
    stream: Option<StreamHandle>,
}

/// Binds a log session to the viewer's navigation.
///
/// Owns at most one stream at a time. The stream is closed when the final
/// event arrives, when another broadcast is observed, when the viewer
/// navigates off a broadcast page, and on drop.
pub struct LifecycleCoordinator<C: LogStreamConnector> {
    connector: C,
    session: Option<Session>,
    final_signal: Option<LogEvent>,
    last_location: Option<String>,
    history: HashMap<String, Vec<LogEvent>>,
}

impl<C: LogStreamConnector> LifecycleCoordinator<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            session: None,
            final_signal: None,
            last_location: None,
            history: HashMap::new(),
        }
    }

    /// Starts watching a broadcast. Observing the current one again is a no-op.
    pub fn observe(&mut self, broadcast_id: &str) {
        if self.broadcast_id() == Some(broadcast_id) {
            debug!("SESSION: Already observing {}", broadcast_id);
            return;
        }

        self.teardown();
        self.final_signal = None;

        info!("SESSION: Observing broadcast {}", broadcast_id);
        let accumulator = LogAccumulator::new(broadcast_id);
        let stream = self.connector.open(broadcast_id);
        if stream.is_none() {
            warn!("SESSION: No stream for broadcast '{}'", broadcast_id);
        }

        self.session = Some(Session { accumulator, stream });
    }

    /// Handles a location change reported by the navigation layer
    pub fn navigate(&mut self, location: &str) {
        let moved = self.last_location.as_deref() != Some(location);
        if moved && self.recorded_events() >= 2 && self.final_signal.take().is_some() {
            debug!("SESSION: Cleared final event on navigation to {}", location);
        }
        self.last_location = Some(location.to_string());

        match routing::resolve(location) {
            Route::Broadcast(id) => self.observe(&id),
            Route::Other => {
                if self.session.is_some() {
                    debug!("SESSION: {} is not a broadcast page", location);
                }
                self.teardown();
            }
        }
    }

    /// Closes the stream and drops the session
    pub fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Some(stream) = session.stream.as_mut() {
                stream.close();
            }
            info!("SESSION: Stopped observing {}", session.accumulator.broadcast_id());
        }
    }

    /// Waits for the next event of the live stream and folds it into the log
    pub async fn next_update(&mut self) -> SessionUpdate {
        let Some(session) = self.session.as_mut() else {
            return SessionUpdate::Idle;
        };
        let Some(stream) = session.stream.as_mut() else {
            return SessionUpdate::Idle;
        };

        let Some(event) = stream.recv().await else {
            info!(
                "SESSION: Stream for {} ended in state {:?}",
                session.accumulator.broadcast_id(),
                session.accumulator.state()
            );
            session.stream = None;
            return SessionUpdate::StreamEnded;
        };

        let broadcast_id = session.accumulator.broadcast_id().to_string();
        let update = match session.accumulator.ingest(event) {
            Ingested::Appended => match session.accumulator.log().last() {
                Some(entry) => SessionUpdate::Appended(entry.clone()),
                None => SessionUpdate::Ignored,
            },
            Ingested::Completed => {
                if let Some(mut stream) = session.stream.take() {
                    stream.close();
                }
                match session.accumulator.final_event().cloned() {
                    Some(last) => {
                        self.final_signal = Some(last.clone());
                        SessionUpdate::Completed(last)
                    }
                    None => SessionUpdate::Ignored,
                }
            }
            Ingested::Ignored => SessionUpdate::Ignored,
        };

        // Only accepted events, as stored (relabelled) by the accumulator
        if let SessionUpdate::Appended(event) | SessionUpdate::Completed(event) = &update {
            self.history.entry(broadcast_id).or_default().push(event.clone());
        }
        update
    }

    pub fn broadcast_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.accumulator.broadcast_id())
    }

    /// Ordered log of the current session, empty when nothing is observed
    pub fn log(&self) -> &[LogEvent] {
        self.session.as_ref().map(|s| s.accumulator.log()).unwrap_or(&[])
    }

    /// Final event as presented to the viewer. Cleared on navigation even
    /// when the session itself stays completed.
    pub fn final_event(&self) -> Option<&LogEvent> {
        self.final_signal.as_ref()
    }

    pub fn state(&self) -> Option<SessionState> {
        self.session.as_ref().map(|s| s.accumulator.state())
    }

    pub fn is_streaming(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.stream.is_some())
    }

    pub fn recorded_events(&self) -> usize {
        self.session.as_ref().map(|s| s.accumulator.recorded_events()).unwrap_or(0)
    }

    /// Every event accepted for a broadcast, final event included, across sessions
    pub fn history(&self, broadcast_id: &str) -> &[LogEvent] {
        self.history.get(broadcast_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn status(&self) -> ViewerStatus {
        match self.broadcast_id() {
            None | Some("") => ViewerStatus::NotInitiated,
            Some(_) if self.final_signal.is_none() => ViewerStatus::Processing,
            Some(_) => ViewerStatus::Delivered,
        }
    }
}

impl<C: LogStreamConnector> Drop for LifecycleCoordinator<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
