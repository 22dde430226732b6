use crate::stream::event::{BROADCAST_SENT, DEVICE_CHANNEL, LogEvent};
use tracing::{debug, info, warn};

/// Externally visible phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Only the boundary event is recorded
    Empty,
    /// At least one hop was appended
    Accumulating,
    /// The final event was observed; the stream must be closed
    Completed,
}

/// Result of handing one event to [`LogAccumulator::ingest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Appended,
    /// The event was final. The caller has to close the stream.
    Completed,
    Ignored,
}

/// Decides whether an event marks delivery to the end-user device.
///
/// The log service has no end-of-stream frame, so completion is read from
/// the hop's receiver.
pub fn is_final_event(event: &LogEvent) -> bool {
    event.receiver == DEVICE_CHANNEL
}

#[derive(Debug, Clone)]
enum Phase {
    Empty,
    Accumulating,
    Completed(LogEvent),
}

/// Ordered log of one broadcast's hops plus its final event
#[derive(Debug, Clone)]
pub struct LogAccumulator {
    broadcast_id: String,
    log: Vec<LogEvent>,
    phase: Phase,
}

impl LogAccumulator {
    pub fn new(broadcast_id: &str) -> Self {
        Self {
            broadcast_id: broadcast_id.to_string(),
            log: vec![LogEvent::boundary(broadcast_id)],
            phase: Phase::Empty,
        }
    }

    /// Drops everything and starts over with a new boundary event
    pub fn reset(&mut self, broadcast_id: &str) {
        debug!("SESSION: Resetting log for broadcast {}", broadcast_id);
        *self = Self::new(broadcast_id);
    }

    pub fn ingest(&mut self, mut event: LogEvent) -> Ingested {
        if let Phase::Completed(_) = self.phase {
            debug!(
                "SESSION: Broadcast {} already completed, ignoring event #{}",
                self.broadcast_id, event.sequence_id
            );
            return Ingested::Ignored;
        }

        if !event.broadcast_id.is_empty() && event.broadcast_id != self.broadcast_id {
            warn!(
                "SESSION: Event #{} belongs to broadcast {}, not {}",
                event.sequence_id, event.broadcast_id, self.broadcast_id
            );
            return Ingested::Ignored;
        }

        if is_final_event(&event) {
            event.mark_final();
            info!(
                "SESSION: Broadcast {} delivered after {} hops",
                self.broadcast_id,
                self.log.len() - 1
            );
            self.phase = Phase::Completed(event);
            return Ingested::Completed;
        }

        // The hand-over to the device channel closes the timeline
        if event.content == BROADCAST_SENT {
            event.mark_final();
        }

        self.log.push(event);
        self.phase = Phase::Accumulating;
        Ingested::Appended
    }

    pub fn broadcast_id(&self) -> &str {
        &self.broadcast_id
    }

    /// Recorded hops in arrival order, boundary first
    pub fn log(&self) -> &[LogEvent] {
        &self.log
    }

    pub fn final_event(&self) -> Option<&LogEvent> {
        match &self.phase {
            Phase::Completed(event) => Some(event),
            _ => None,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Empty => SessionState::Empty,
            Phase::Accumulating => SessionState::Accumulating,
            Phase::Completed(_) => SessionState::Completed,
        }
    }

    /// Number of events held, final event included
    pub fn recorded_events(&self) -> usize {
        self.log.len() + usize::from(self.final_event().is_some())
    }
}
