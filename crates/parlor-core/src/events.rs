//! Event parser for the `data: <json>` line protocol.
//!
//! Each server-pushed unit is one line:
//! ```text
//! data: {"type":"status","text":"[ONLINE]"}
//! data: {"type":"text","text":"Hello "}
//! data: {"type":"done"}
//! ```
//! The protocol is line-oriented rather than strict SSE: blank keep-alive
//! lines, comments and `event:` framing are dropped without comment.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Literal prefix of every candidate event line (case-sensitive, one space).
pub const DATA_PREFIX: &str = "data: ";

/// One event decoded from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Reply text to append to the transcript.
    Text { payload: String },
    /// Diagnostic status line (e.g. the backend's online/offline indicator).
    Status { payload: String },
    /// Normal end of the exchange.
    Done,
    /// Well-formed envelope with a `type` this client does not handle.
    Unrecognized { raw: String },
}

/// A `data: ` line whose payload could not be interpreted.
///
/// Never surfaced to the user; the parser logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEvent {
    pub reason: String,
    pub payload: String,
}

impl fmt::Display for MalformedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed event ({}): {}", self.reason, self.payload)
    }
}

impl std::error::Error for MalformedEvent {}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Classifies a single completed line.
///
/// Returns `Ok(None)` for lines that are not events at all (blank lines and
/// anything without the `data: ` prefix).
///
/// # Errors
/// Returns [`MalformedEvent`] when a `data: ` payload is not a JSON object
/// with a string `type` field.
pub fn parse_line(line: &str) -> Result<Option<ServerEvent>, MalformedEvent> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };

    let malformed = |reason: String| MalformedEvent {
        reason,
        payload: payload.to_string(),
    };
    let value: Value = serde_json::from_str(payload).map_err(|err| malformed(err.to_string()))?;
    if !value.is_object() {
        return Err(malformed("payload is not a JSON object".to_string()));
    }
    let envelope = Envelope::deserialize(value).map_err(|err| malformed(err.to_string()))?;

    let event = match envelope.kind.as_str() {
        "text" => ServerEvent::Text {
            payload: envelope.text.unwrap_or_default(),
        },
        "status" => ServerEvent::Status {
            payload: envelope.text.unwrap_or_default(),
        },
        "done" => ServerEvent::Done,
        _ => ServerEvent::Unrecognized {
            raw: payload.to_string(),
        },
    };
    Ok(Some(event))
}

/// Assistant reply text accumulated during one exchange.
///
/// Append-only: the only mutation is [`Transcript::append`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Per-exchange event parser that owns the transcript.
#[derive(Debug, Default)]
pub struct EventParser {
    transcript: Transcript,
    malformed: usize,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a line and applies it to the transcript.
    ///
    /// Malformed payloads are logged and dropped. The returned event is the one
    /// that was applied, if any.
    pub fn feed_line(&mut self, line: &str) -> Option<ServerEvent> {
        let event = match parse_line(line) {
            Ok(Some(event)) => event,
            Ok(None) => {
                if !line.trim().is_empty() {
                    tracing::debug!(line = %line.trim(), "ignoring non-event line");
                }
                return None;
            }
            Err(err) => {
                self.malformed += 1;
                tracing::warn!(error = %err, "dropping malformed stream event");
                return None;
            }
        };

        match &event {
            ServerEvent::Text { payload } => self.transcript.append(payload),
            ServerEvent::Status { payload } => tracing::debug!(status = %payload, "stream status"),
            ServerEvent::Done => tracing::debug!("stream done"),
            ServerEvent::Unrecognized { raw } => {
                tracing::debug!(raw = %raw, "ignoring unrecognized event type");
            }
        }
        Some(event)
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Number of malformed events dropped so far.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_event() {
        let event = parse_line(r#"data: {"type":"text","text":"Hello"}"#).unwrap();
        assert_eq!(
            event,
            Some(ServerEvent::Text {
                payload: "Hello".to_string()
            })
        );
    }

    #[test]
    fn test_parse_status_and_done() {
        assert_eq!(
            parse_line(r#"data: {"type":"status","text":"[ONLINE]"}"#).unwrap(),
            Some(ServerEvent::Status {
                payload: "[ONLINE]".to_string()
            })
        );
        assert_eq!(
            parse_line(r#"data: {"type":"done"}"#).unwrap(),
            Some(ServerEvent::Done)
        );
    }

    #[test]
    fn test_unknown_type_is_unrecognized() {
        let line = r#"data: {"type":"metadata","confidence":"HIGH","verified":true}"#;
        assert_eq!(
            parse_line(line).unwrap(),
            Some(ServerEvent::Unrecognized {
                raw: r#"{"type":"metadata","confidence":"HIGH","verified":true}"#.to_string()
            })
        );
    }

    #[test]
    fn test_non_data_lines_are_ignored() {
        assert_eq!(parse_line("not-data: ignored").unwrap(), None);
        assert_eq!(parse_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_line("event: message").unwrap(), None);
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
        // Prefix is case-sensitive and needs the single space.
        assert_eq!(parse_line(r#"DATA: {"type":"done"}"#).unwrap(), None);
        assert_eq!(parse_line(r#"data:{"type":"done"}"#).unwrap(), None);
    }

    #[test]
    fn test_trailing_carriage_return_is_trimmed() {
        assert_eq!(
            parse_line("data: {\"type\":\"done\"}\r").unwrap(),
            Some(ServerEvent::Done)
        );
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = parse_line(r#"data: {"type":"text","text":"unterminated"#).unwrap_err();
        assert_eq!(err.payload, r#"{"type":"text","text":"unterminated"#);
    }

    #[test]
    fn test_missing_type_is_malformed() {
        assert!(parse_line(r#"data: {"text":"orphan"}"#).is_err());
        assert!(parse_line(r#"data: ["text", "hi"]"#).is_err());
    }

    #[test]
    fn test_text_event_without_text_field_is_empty() {
        assert_eq!(
            parse_line(r#"data: {"type":"text"}"#).unwrap(),
            Some(ServerEvent::Text {
                payload: String::new()
            })
        );
    }

    #[test]
    fn test_parser_accumulates_text_in_order() {
        let mut parser = EventParser::new();
        parser.feed_line(r#"data: {"type":"status","text":"[OFFLINE]"}"#);
        parser.feed_line(r#"data: {"type":"text","text":"Hello"}"#);
        parser.feed_line(r#"data: {"type":"text","text":", world"}"#);
        let last = parser.feed_line(r#"data: {"type":"done"}"#);

        assert_eq!(last, Some(ServerEvent::Done));
        assert_eq!(parser.transcript().as_str(), "Hello, world");
    }

    #[test]
    fn test_parser_drops_malformed_and_keeps_going() {
        let mut parser = EventParser::new();
        parser.feed_line(r#"data: {"type":"text","text":"a"}"#);
        assert!(parser.feed_line("data: {oops").is_none());
        parser.feed_line(r#"data: {"type":"text","text":"b"}"#);

        assert_eq!(parser.transcript().as_str(), "ab");
        assert_eq!(parser.malformed_count(), 1);
    }

    #[test]
    fn test_parser_ignores_non_data_without_touching_transcript() {
        let mut parser = EventParser::new();
        parser.feed_line(r#"data: {"type":"text","text":"kept"}"#);
        assert!(parser.feed_line("not-data: ignored").is_none());
        assert_eq!(parser.transcript().as_str(), "kept");
        assert_eq!(parser.malformed_count(), 0);
    }

    #[test]
    fn test_status_does_not_affect_transcript() {
        let mut parser = EventParser::new();
        parser.feed_line(r#"data: {"type":"status","text":"[ONLINE]"}"#);
        assert!(parser.transcript().is_empty());
    }
}
