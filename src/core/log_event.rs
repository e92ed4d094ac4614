//! Log event record stored in ring buffer slots

use super::error::Result;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Timestamp layout used by the text exporters
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

// Thread-local caches for thread information to avoid repeated formatting
thread_local! {
    static THREAD_ID: String = format!("{:?}", std::thread::current().id());
    static THREAD_NAME: Option<String> = std::thread::current().name().map(String::from);
}

/// Body of a log event
///
/// Typed values are serialized into a [`serde_json::Value`] by the producer
/// before a slot is claimed; raw bytes are copied into the slot's own buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    #[default]
    Empty,
    Value(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Payload {
    /// Render the payload as text
    ///
    /// String values are rendered without quotes, other values as compact JSON
    /// and bytes as lossy UTF-8.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Payload::Empty => Cow::Borrowed(""),
            Payload::Value(serde_json::Value::String(s)) => Cow::Borrowed(s),
            Payload::Value(v) => Cow::Owned(v.to_string()),
            Payload::Bytes(b) => String::from_utf8_lossy(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::Value(v) => v.to_string().len(),
            Payload::Bytes(b) => b.len(),
        }
    }
}

/// Payload handed to a producer for writing into a claimed slot
pub(crate) enum PayloadSource<'a> {
    Value(serde_json::Value),
    Bytes(&'a [u8]),
    Event(LogEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub sequence: u64,
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub payload: Payload,
}

impl Default for LogEvent {
    fn default() -> Self {
        Self {
            sequence: 0,
            level: LogLevel::Info,
            timestamp: DateTime::<Utc>::default(),
            thread_id: String::new(),
            thread_name: None,
            payload: Payload::Empty,
        }
    }
}

impl LogEvent {
    pub fn new(level: LogLevel, payload: Payload) -> Self {
        Self {
            sequence: 0,
            level,
            timestamp: Utc::now(),
            thread_id: THREAD_ID.with(Clone::clone),
            thread_name: THREAD_NAME.with(Clone::clone),
            payload,
        }
    }

    /// Build an event from any serializable value
    pub fn value<T: Serialize + ?Sized>(level: LogLevel, value: &T) -> Result<Self> {
        Ok(Self::new(level, Payload::Value(serde_json::to_value(value)?)))
    }

    /// Build an event from raw bytes
    pub fn bytes(level: LogLevel, bytes: &[u8]) -> Self {
        Self::new(level, Payload::Bytes(bytes.to_vec()))
    }

    /// Overwrite this (recycled) slot in place
    ///
    /// Byte payloads reuse the slot's existing buffer, thread identity strings
    /// reuse their allocations.
    pub(crate) fn fill(&mut self, sequence: u64, level: LogLevel, source: PayloadSource<'_>) {
        match source {
            PayloadSource::Event(event) => {
                *self = event;
                self.sequence = sequence;
                return;
            }
            PayloadSource::Value(value) => self.payload = Payload::Value(value),
            PayloadSource::Bytes(bytes) => match &mut self.payload {
                Payload::Bytes(buf) => {
                    buf.clear();
                    buf.extend_from_slice(bytes);
                }
                other => *other = Payload::Bytes(bytes.to_vec()),
            },
        }

        self.sequence = sequence;
        self.level = level;
        self.timestamp = Utc::now();
        THREAD_ID.with(|id| {
            self.thread_id.clear();
            self.thread_id.push_str(id);
        });
        THREAD_NAME.with(|name| match (name, &mut self.thread_name) {
            (Some(name), Some(slot)) => {
                slot.clear();
                slot.push_str(name);
            }
            (name, slot) => *slot = name.clone(),
        });
    }

    /// Payload text with line breaks escaped, so one event stays on one line
    pub fn sanitized_message(&self) -> String {
        self.payload
            .as_text()
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn thread_label(&self) -> &str {
        self.thread_name.as_deref().unwrap_or(&self.thread_id)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{:5}] [{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level.to_str(),
            self.thread_label(),
            self.sanitized_message()
        )
    }
}
