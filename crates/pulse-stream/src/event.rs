//! Event model and payload parsing

use crate::error::MalformedEventError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

/// Monotonic event identifier assigned by the ingestion buffer.
pub type EventId = u64;

/// Closed set of event categories accepted from the live channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    ContentCreated,
    ContentUpdated,
    ContentPublished,
    ContentDeleted,
    PipelineStarted,
    PipelineStep,
    PipelineCompleted,
    PipelineFailed,
    System,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::ContentCreated,
        EventKind::ContentUpdated,
        EventKind::ContentPublished,
        EventKind::ContentDeleted,
        EventKind::PipelineStarted,
        EventKind::PipelineStep,
        EventKind::PipelineCompleted,
        EventKind::PipelineFailed,
        EventKind::System,
    ];

    /// Wire name, e.g. "content_created".
    pub fn as_wire(&self) -> &'static str {
        match self {
            EventKind::ContentCreated => "content_created",
            EventKind::ContentUpdated => "content_updated",
            EventKind::ContentPublished => "content_published",
            EventKind::ContentDeleted => "content_deleted",
            EventKind::PipelineStarted => "pipeline_started",
            EventKind::PipelineStep => "pipeline_step",
            EventKind::PipelineCompleted => "pipeline_completed",
            EventKind::PipelineFailed => "pipeline_failed",
            EventKind::System => "system",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_wire() == s)
    }

    /// Short label for list rows.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::ContentCreated => "created",
            EventKind::ContentUpdated => "updated",
            EventKind::ContentPublished => "published",
            EventKind::ContentDeleted => "deleted",
            EventKind::PipelineStarted => "started",
            EventKind::PipelineStep => "step",
            EventKind::PipelineCompleted => "done",
            EventKind::PipelineFailed => "failed",
            EventKind::System => "system",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EventKind::PipelineFailed)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Open mapping of auxiliary fields carried by an event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn content_id(&self) -> Option<String> {
        match self.0.get("contentId")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn step(&self) -> Option<&str> {
        self.0.get("step").and_then(Value::as_str)
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> Option<u64> {
        match self.0.get("duration")? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|v| *v >= 0.0).map(|v| v.round() as u64)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Metadata(map)
    }
}

/// One received occurrence. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub metadata: Option<Metadata>,
}

/// Payload shape as it arrives on the wire.
#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(rename = "type")]
    kind: String,
    message: String,
    #[serde(default)]
    meta: Option<Map<String, Value>>,
    #[serde(default, alias = "occurredAt")]
    timestamp: Option<String>,
}

/// Parsed payload, waiting for the buffer to assign an id.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedPayload {
    pub kind: EventKind,
    pub message: String,
    pub occurred_at: Option<DateTime<Utc>>,
    pub metadata: Option<Metadata>,
}

impl ParsedPayload {
    pub fn parse(raw: &str) -> Result<Self, MalformedEventError> {
        let payload: RawPayload = serde_json::from_str(raw)?;

        let kind = EventKind::from_wire(&payload.kind)
            .ok_or_else(|| MalformedEventError::UnknownKind(payload.kind.clone()))?;

        let occurred_at = match payload.timestamp {
            Some(ts) => Some(
                DateTime::parse_from_rfc3339(&ts)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| MalformedEventError::Timestamp(ts))?,
            ),
            None => None,
        };

        Ok(ParsedPayload {
            kind,
            message: payload.message,
            occurred_at,
            metadata: payload.meta.map(Metadata::from),
        })
    }

    /// Finish the event. Missing timestamps become the receipt time.
    pub fn into_event(self, id: EventId, received_at: DateTime<Utc>) -> Event {
        Event {
            id,
            kind: self.kind,
            message: self.message,
            occurred_at: self.occurred_at.unwrap_or(received_at),
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_payload() {
        let parsed = ParsedPayload::parse(r#"{"type":"content_created","message":"Post drafted"}"#)
            .unwrap();
        assert_eq!(parsed.kind, EventKind::ContentCreated);
        assert_eq!(parsed.message, "Post drafted");
        assert!(parsed.occurred_at.is_none());
        assert!(parsed.metadata.is_none());
    }

    #[test]
    fn test_parse_meta_fields() {
        let raw = r#"{"type":"pipeline_step","message":"Rendering","meta":{"contentId":42,"step":"render","duration":1250}}"#;
        let parsed = ParsedPayload::parse(raw).unwrap();
        let meta = parsed.metadata.unwrap();
        assert_eq!(meta.content_id().as_deref(), Some("42"));
        assert_eq!(meta.step(), Some("render"));
        assert_eq!(meta.duration_ms(), Some(1250));
    }

    #[test]
    fn test_parse_timestamp_alias() {
        let raw = r#"{"type":"system","message":"hi","occurredAt":"2024-05-01T10:00:00Z"}"#;
        let parsed = ParsedPayload::parse(raw).unwrap();
        let ts = parsed.occurred_at.unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_missing_timestamp_uses_receipt_time() {
        let received = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = ParsedPayload::parse(r#"{"type":"system","message":"x"}"#)
            .unwrap()
            .into_event(7, received);
        assert_eq!(event.id, 7);
        assert_eq!(event.occurred_at, received);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            ParsedPayload::parse("{not json"),
            Err(MalformedEventError::Json(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let err = ParsedPayload::parse(r#"{"type":"weather","message":"sunny"}"#).unwrap_err();
        assert!(matches!(err, MalformedEventError::UnknownKind(k) if k == "weather"));
    }

    #[test]
    fn test_rejects_missing_message() {
        assert!(ParsedPayload::parse(r#"{"type":"system"}"#).is_err());
    }

    #[test]
    fn test_rejects_bad_timestamp_and_non_object_meta() {
        assert!(matches!(
            ParsedPayload::parse(r#"{"type":"system","message":"x","timestamp":"yesterday"}"#),
            Err(MalformedEventError::Timestamp(_))
        ));
        assert!(ParsedPayload::parse(r#"{"type":"system","message":"x","meta":[1,2]}"#).is_err());
    }

    #[test]
    fn test_kind_wire_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire(kind.as_wire()), Some(kind));
        }
    }

    #[test]
    fn test_kind_table_is_the_only_wire_mapping() {
        for kind in EventKind::ALL {
            assert_eq!(kind.to_string(), kind.as_wire());
            let raw = format!(r#"{{"type":"{}","message":"m"}}"#, kind.as_wire());
            assert_eq!(ParsedPayload::parse(&raw).unwrap().kind, kind);
        }
        // Variant spellings are not wire names.
        let err = ParsedPayload::parse(r#"{"type":"ContentCreated","message":"m"}"#).unwrap_err();
        assert!(matches!(err, MalformedEventError::UnknownKind(k) if k == "ContentCreated"));
    }
}
