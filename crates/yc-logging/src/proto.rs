// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Messages of `yandex.cloud.logging.v1` used by the ingestion call.
//!
//! ```protobuf
//! service LogIngestionService {
//!   rpc Write (WriteRequest) returns (WriteResponse);
//! }
//!
//! message WriteRequest {
//!   Destination destination = 1;
//!   LogEntryResource resource = 2;
//!   repeated IncomingLogEntry entries = 3;
//! }
//!
//! message Destination {
//!   oneof destination {
//!     string log_group_id = 1;
//!     string folder_id = 2;
//!   }
//! }
//!
//! message LogEntryResource {
//!   string type = 1;
//!   string id = 2;
//! }
//!
//! message IncomingLogEntry {
//!   google.protobuf.Timestamp timestamp = 1;
//!   LogLevel.Level level = 2;
//!   string message = 3;
//!   google.protobuf.Struct json_payload = 4;
//! }
//!
//! message WriteResponse {
//!   map<int64, google.rpc.Status> errors = 1;
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use prost_types::value::Kind;
use serde_json::Value;

use crate::error::MarshalError;
use crate::event::Record;

pub const WRITE_PATH: &str = "/yandex.cloud.logging.v1.LogIngestionService/Write";

/// Deepest payload nesting accepted by the ingestion API.
pub const MAX_PAYLOAD_DEPTH: usize = 100;

#[derive(Clone, PartialEq, prost::Message)]
pub struct WriteRequest {
    #[prost(message, optional, tag = "1")]
    pub destination: Option<Destination>,
    #[prost(message, optional, tag = "2")]
    pub resource: Option<LogEntryResource>,
    #[prost(message, repeated, tag = "3")]
    pub entries: Vec<IncomingLogEntry>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Destination {
    #[prost(oneof = "destination::Target", tags = "1, 2")]
    pub target: Option<destination::Target>,
}

pub mod destination {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Target {
        #[prost(string, tag = "1")]
        LogGroupId(String),
        #[prost(string, tag = "2")]
        FolderId(String),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogEntryResource {
    #[prost(string, tag = "1")]
    pub r#type: String,
    #[prost(string, tag = "2")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct IncomingLogEntry {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<prost_types::Timestamp>,
    #[prost(enumeration = "Level", tag = "2")]
    pub level: i32,
    #[prost(string, tag = "3")]
    pub message: String,
    #[prost(message, optional, tag = "4")]
    pub json_payload: Option<prost_types::Struct>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WriteResponse {
    #[prost(map = "int64, message", tag = "1")]
    pub errors: HashMap<i64, Status>,
}

/// The part of `google.rpc.Status` the client reports.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Status {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Level {
    Unspecified = 0,
    Trace = 1,
    Debug = 2,
    Info = 3,
    Warn = 4,
    Error = 5,
    Fatal = 6,
}

impl Level {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unspecified => "LEVEL_UNSPECIFIED",
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Resolves a level by its proto name, ignoring ASCII case.
    /// Unknown names resolve to [`Level::Unspecified`].
    pub fn from_name(name: &str) -> Self {
        [
            Self::Trace,
            Self::Debug,
            Self::Info,
            Self::Warn,
            Self::Error,
            Self::Fatal,
        ]
        .into_iter()
        .find(|level| level.as_str_name().eq_ignore_ascii_case(name.trim()))
        .unwrap_or(Self::Unspecified)
    }
}

pub fn timestamp(time: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: time.timestamp(),
        nanos: i32::try_from(time.timestamp_subsec_nanos()).unwrap_or(0),
    }
}

pub fn to_struct(record: &Record) -> Result<prost_types::Struct, MarshalError> {
    struct_at(record, 1)
}

fn struct_at(record: &Record, depth: usize) -> Result<prost_types::Struct, MarshalError> {
    if depth > MAX_PAYLOAD_DEPTH {
        return Err(MarshalError::DepthExceeded(MAX_PAYLOAD_DEPTH));
    }
    let fields = record
        .iter()
        .map(|(key, value)| Ok((key.clone(), value_at(value, depth)?)))
        .collect::<Result<BTreeMap<_, _>, MarshalError>>()?;
    Ok(prost_types::Struct { fields })
}

fn value_at(value: &Value, depth: usize) -> Result<prost_types::Value, MarshalError> {
    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(items) => {
            if depth + 1 > MAX_PAYLOAD_DEPTH {
                return Err(MarshalError::DepthExceeded(MAX_PAYLOAD_DEPTH));
            }
            let values = items
                .iter()
                .map(|item| value_at(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Kind::ListValue(prost_types::ListValue { values })
        }
        Value::Object(map) => Kind::StructValue(struct_at(map, depth + 1)?),
    };
    Ok(prost_types::Value { kind: Some(kind) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    fn nested(depth: usize) -> Value {
        (1..depth).fold(json!({"leaf": true}), |inner, _| json!({ "n": inner }))
    }

    #[test]
    fn test_level_from_name() {
        assert_eq!(Level::from_name("DEBUG"), Level::Debug);
        assert_eq!(Level::from_name("warn"), Level::Warn);
        assert_eq!(Level::from_name("FATAL"), Level::Fatal);
        assert_eq!(Level::from_name("LEVEL_UNSPECIFIED"), Level::Unspecified);
        assert_eq!(Level::from_name("TEST_DEBUG"), Level::Unspecified);
        assert_eq!(Level::from_name(""), Level::Unspecified);
    }

    #[test]
    fn test_timestamp_keeps_nanos() {
        let time = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let ts = timestamp(time);
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 123_456_789);
    }

    #[test]
    fn test_to_struct_converts_values() {
        let payload = to_struct(&record(json!({
            "s": "text",
            "n": 1.5,
            "b": false,
            "z": null,
            "l": [1, "two"],
            "o": {"inner": "v"},
        })))
        .unwrap();

        assert_eq!(payload.fields["s"].kind, Some(Kind::StringValue("text".into())));
        assert_eq!(payload.fields["n"].kind, Some(Kind::NumberValue(1.5)));
        assert_eq!(payload.fields["b"].kind, Some(Kind::BoolValue(false)));
        assert!(matches!(payload.fields["z"].kind, Some(Kind::NullValue(_))));
        let Some(Kind::ListValue(list)) = &payload.fields["l"].kind else {
            panic!("expected list");
        };
        assert_eq!(list.values.len(), 2);
        let Some(Kind::StructValue(inner)) = &payload.fields["o"].kind else {
            panic!("expected struct");
        };
        assert_eq!(inner.fields["inner"].kind, Some(Kind::StringValue("v".into())));
    }

    #[test]
    fn test_to_struct_depth_limit() {
        assert!(to_struct(&record(nested(MAX_PAYLOAD_DEPTH))).is_ok());
        assert_eq!(
            to_struct(&record(nested(MAX_PAYLOAD_DEPTH + 1))),
            Err(MarshalError::DepthExceeded(MAX_PAYLOAD_DEPTH))
        );
    }

    #[test]
    fn test_write_request_wire_tags() {
        let request = WriteRequest {
            destination: Some(Destination {
                target: Some(destination::Target::FolderId("f".into())),
            }),
            resource: Some(LogEntryResource {
                r#type: "t".into(),
                id: "r".into(),
            }),
            entries: vec![IncomingLogEntry {
                level: Level::Info as i32,
                ..Default::default()
            }],
        };
        let bytes = request.encode_to_vec();

        // destination: field 1, length 3, folder_id: field 2, "f"
        assert_eq!(&bytes[..5], &[0x0a, 0x03, 0x12, 0x01, b'f']);
        assert_eq!(WriteRequest::decode(bytes.as_slice()).unwrap(), request);
    }

    #[test]
    fn test_write_response_errors() {
        let mut response = WriteResponse::default();
        response.errors.insert(
            3,
            Status {
                code: 3,
                message: "invalid entry".into(),
            },
        );
        let decoded = WriteResponse::decode(response.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.errors[&3].message, "invalid entry");
    }
}
