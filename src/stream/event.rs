use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Sender/receiver label of the locally inserted boundary event
pub const INITIAL: &str = "Initial";

/// Sender/receiver label given to the event that confirms delivery
pub const FINAL: &str = "Final";

/// Receiver name of the end-user device channel
pub const DEVICE_CHANNEL: &str = "mobile";

/// Sequence id reserved for the boundary event
pub const BOUNDARY_SEQUENCE_ID: i64 = -1;

/// Content of the boundary event
pub const BOUNDARY_CONTENT: &str = "Broadcast Initiated";

/// Hop content the messaging building block emits once it hands the alert over
pub const BROADCAST_SENT: &str = "Broadcast sent";

/// A single hop of a broadcast's delivery pipeline, as pushed by the log service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "id")]
    pub sequence_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(rename = "broadcast", default, deserialize_with = "null_as_default")]
    pub broadcast_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub receiver: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processed: bool,
}

impl LogEvent {
    /// Builds the synthetic event that opens every session log
    pub fn boundary(broadcast_id: &str) -> Self {
        Self {
            sequence_id: BOUNDARY_SEQUENCE_ID,
            content: BOUNDARY_CONTENT.to_string(),
            // Millisecond precision, no zone suffix: same shape the log service uses
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            broadcast_id: broadcast_id.to_string(),
            processed: true,
            receiver: INITIAL.to_string(),
            sender: INITIAL.to_string(),
        }
    }

    pub fn is_boundary(&self) -> bool {
        self.sequence_id == BOUNDARY_SEQUENCE_ID && self.sender == INITIAL && self.receiver == INITIAL
    }

    /// True for entries rendered as a milestone instead of a hop
    pub fn is_milestone(&self) -> bool {
        self.sender == INITIAL || self.sender == FINAL
    }

    /// Relabels sender and receiver with the `Final` sentinel
    pub fn mark_final(&mut self) {
        self.sender = FINAL.to_string();
        self.receiver = FINAL.to_string();
    }

    /// Parses the timestamp. Values without a zone are taken as UTC.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_wire_field_names() {
        let payload = r#"{
            "id": 42,
            "content": "Sending alert to Information Mediator",
            "timestamp": "2024-10-01T12:34:56.789",
            "broadcast": "0d7f3f4e-8b6a-4c4e-9a54-3f1c2b7a9e10",
            "processed": false,
            "receiver": "Information Mediator BB",
            "sender": "Threat Service"
        }"#;

        let event: LogEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.sequence_id, 42);
        assert_eq!(event.broadcast_id, "0d7f3f4e-8b6a-4c4e-9a54-3f1c2b7a9e10");
        assert_eq!(event.sender, "Threat Service");
        assert_eq!(event.receiver, "Information Mediator BB");
        assert!(!event.processed);

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["id"], 42);
        assert_eq!(back["broadcast"], "0d7f3f4e-8b6a-4c4e-9a54-3f1c2b7a9e10");
        assert!(back.get("broadcast_id").is_none());
    }

    #[test]
    fn test_null_and_missing_fields_default() {
        let event: LogEvent =
            serde_json::from_str(r#"{"id": 3, "broadcast": "b", "sender": null, "content": null}"#).unwrap();
        assert_eq!(event.sender, "");
        assert_eq!(event.content, "");
        assert_eq!(event.receiver, "");
        assert!(!event.processed);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(serde_json::from_str::<LogEvent>(r#"{"broadcast": "b"}"#).is_err());
    }

    #[test]
    fn test_boundary_event() {
        let event = LogEvent::boundary("abc");
        assert!(event.is_boundary());
        assert!(event.is_milestone());
        assert_eq!(event.content, BOUNDARY_CONTENT);
        assert_eq!(event.broadcast_id, "abc");
        assert!(event.processed);
        // yyyy-mm-ddThh:mm:ss.mmm
        assert_eq!(event.timestamp.len(), 23);
        assert!(event.parsed_timestamp().is_some());
    }

    #[test]
    fn test_parsed_timestamp_formats() {
        let mut event = LogEvent::boundary("abc");

        event.timestamp = "2024-10-01T12:34:56.789123".to_string();
        let ts = event.parsed_timestamp().unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 10, 1));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (12, 34, 56));

        event.timestamp = "2024-10-01T12:34:56+02:00".to_string();
        assert_eq!(event.parsed_timestamp().unwrap().hour(), 10);

        event.timestamp = "yesterday".to_string();
        assert!(event.parsed_timestamp().is_none());
    }
}
