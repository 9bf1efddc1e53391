//! Log capture for `glassy logs`
//!
//! A tracing-subscriber Layer that keeps the most recent log entries of the
//! daemon in a ring buffer, so they can be read back over IPC.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use glassy_core::LogCaptureLayer;
//! use tracing_subscriber::prelude::*;
//!
//! let (layer, buffer) = LogCaptureLayer::new(1000);
//! tracing_subscriber::registry()
//!     .with(layer)
//!     .with(tracing_subscriber::fmt::layer())
//!     .init();
//! ```

use glassy_protocol::LogEntry;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Shared log buffer type
pub type LogBuffer = Arc<Mutex<VecDeque<LogEntry>>>;

/// A tracing Layer that records log entries into a [`LogBuffer`]
pub struct LogCaptureLayer {
    buffer: LogBuffer,
    max_entries: usize,
}

impl LogCaptureLayer {
    /// Create a layer keeping at most `max_entries`, and its buffer
    pub fn new(max_entries: usize) -> (Self, LogBuffer) {
        let buffer = Arc::new(Mutex::new(VecDeque::with_capacity(max_entries)));
        let layer = Self {
            buffer: buffer.clone(),
            max_entries,
        };
        (layer, buffer)
    }
}

/// Visitor to extract the message field from a tracing event
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let message = match (visitor.message.is_empty(), visitor.fields.is_empty()) {
            (_, true) => visitor.message,
            (true, false) => visitor.fields.join(", "),
            (false, false) => format!("{} {}", visitor.message, visitor.fields.join(", ")),
        };

        let entry = LogEntry {
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message,
            timestamp_ms: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        };

        let mut buf = self.buffer.lock();
        buf.push_back(entry);
        while buf.len() > self.max_entries {
            buf.pop_front();
        }
    }
}

/// Severity rank of a level name; unknown names rank lowest
pub fn level_to_priority(level: &str) -> u8 {
    match level.to_uppercase().as_str() {
        "ERROR" => 5,
        "WARN" => 4,
        "INFO" => 3,
        "DEBUG" => 2,
        "TRACE" => 1,
        _ => 0,
    }
}

/// Entries at or above `level`, keeping the newest `limit`, oldest first
pub fn recent_logs(buffer: &LogBuffer, level: Option<&str>, limit: Option<usize>) -> Vec<LogEntry> {
    let min_priority = level.map(level_to_priority).unwrap_or(0);
    let buf = buffer.lock();
    let matching: Vec<LogEntry> = buf
        .iter()
        .filter(|e| level_to_priority(&e.level) >= min_priority)
        .cloned()
        .collect();

    match limit {
        Some(limit) if matching.len() > limit => matching[matching.len() - limit..].to_vec(),
        _ => matching,
    }
}
