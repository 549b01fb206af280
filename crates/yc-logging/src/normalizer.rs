// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use tracing::{debug, error};

use crate::event::{Event, FieldError};
use crate::proto::Level;
use crate::request::{LogRecordEntry, LEVEL_UNSPECIFIED};

/// Pulls the well-known fields out of an event. Never fails: a missing,
/// malformed or unknown level becomes `LEVEL_UNSPECIFIED`, a missing message
/// is omitted. Levels are resolved here once so both backends send the same one.
#[derive(Debug, Clone)]
pub struct Normalizer {
    level_key: String,
    message_key: String,
}

impl Normalizer {
    pub fn new(level_key: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self {
            level_key: level_key.into(),
            message_key: message_key.into(),
        }
    }

    pub fn normalize(&self, mut event: Event) -> LogRecordEntry {
        let level = match event.pop_level(&self.level_key) {
            Ok(level) if !level.is_empty() => self.resolve_level(&level),
            Ok(_) => {
                debug!("Empty log level in key {}, using {LEVEL_UNSPECIFIED}", self.level_key);
                LEVEL_UNSPECIFIED.to_string()
            }
            Err(err @ FieldError::Absent(_)) => {
                debug!("{err}, ignoring log level key");
                LEVEL_UNSPECIFIED.to_string()
            }
            Err(err @ FieldError::NotText(_)) => {
                error!("Could not cast log level key: {err}");
                LEVEL_UNSPECIFIED.to_string()
            }
        };

        let message = match event.pop_message(&self.message_key) {
            Ok(message) => Some(message),
            Err(err) => {
                debug!("{err}, entry has no message");
                None
            }
        };

        LogRecordEntry {
            timestamp: Some(event.timestamp),
            level,
            message,
            json_payload: event.record,
        }
    }

    fn resolve_level(&self, name: &str) -> String {
        let level = Level::from_name(name);
        if level == Level::Unspecified && !name.trim().eq_ignore_ascii_case(LEVEL_UNSPECIFIED) {
            debug!(
                "Unknown log level `{name}` in key {}, using {LEVEL_UNSPECIFIED}",
                self.level_key
            );
        }
        level.as_str_name().to_string()
    }

    pub fn normalize_all(&self, events: &[Event]) -> Vec<LogRecordEntry> {
        events
            .iter()
            .cloned()
            .map(|event| self.normalize(event))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{json, Value};
    use tracing_test::traced_test;

    fn event(fields: Value) -> Event {
        let Value::Object(record) = fields else {
            panic!("expected object");
        };
        Event::new(Utc::now(), record, "test_tag")
    }

    #[test]
    fn test_normalize_extracts_level_and_message() {
        let normalizer = Normalizer::new("log_level", "message");
        let source = event(json!({"log_level": "DEBUG", "message": "m", "k": "v"}));
        let timestamp = source.timestamp;

        let entry = normalizer.normalize(source);

        assert_eq!(entry.level, "DEBUG");
        assert_eq!(entry.message.as_deref(), Some("m"));
        assert_eq!(entry.timestamp, Some(timestamp));
        assert_eq!(Value::Object(entry.json_payload), json!({"k": "v"}));
    }

    #[traced_test]
    #[test]
    fn test_missing_level_is_unspecified() {
        let normalizer = Normalizer::new("level", "message");
        let entry = normalizer.normalize(event(json!({"k": "v"})));

        assert_eq!(entry.level, LEVEL_UNSPECIFIED);
        assert_eq!(entry.message, None);
        assert!(logs_contain("ignoring log level key"));
    }

    #[traced_test]
    #[test]
    fn test_non_text_level_is_unspecified_and_kept_in_payload() {
        let normalizer = Normalizer::new("level", "message");
        let entry = normalizer.normalize(event(json!({"level": 3, "message": "m"})));

        assert_eq!(entry.level, LEVEL_UNSPECIFIED);
        assert_eq!(entry.json_payload.get("level"), Some(&json!(3)));
        assert!(logs_contain("Could not cast log level key"));
    }

    #[traced_test]
    #[test]
    fn test_level_names_are_resolved() {
        let normalizer = Normalizer::new("level", "message");

        let lower = normalizer.normalize(event(json!({"level": " warn "})));
        assert_eq!(lower.level, "WARN");

        let unknown = normalizer.normalize(event(json!({"level": "TEST_DEBUG"})));
        assert_eq!(unknown.level, LEVEL_UNSPECIFIED);
        assert!(logs_contain("Unknown log level `TEST_DEBUG` in key level"));
    }

    #[test]
    fn test_normalize_all_keeps_source_events() {
        let normalizer = Normalizer::new("level", "message");
        let events = vec![
            event(json!({"level": "INFO", "a": 1})),
            event(json!({"b": 2})),
        ];

        let entries = normalizer.normalize_all(&events);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, "INFO");
        assert_eq!(entries[1].level, LEVEL_UNSPECIFIED);
        assert!(events[0].record.contains_key("level"));
    }
}
