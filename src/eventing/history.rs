//! Emission history entries and payload snapshots

use chrono::{DateTime, Local};
use serde::Serialize;

/// Copy of an emitted payload kept for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PayloadSnapshot {
    /// JSON copy of the payload at emit time
    Value(serde_json::Value),
    /// The payload could not be copied
    Unclonable,
}

impl PayloadSnapshot {
    /// Snapshot a serializable payload, falling back to the sentinel
    pub fn capture<P: Serialize + ?Sized>(payload: &P) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => PayloadSnapshot::Value(value),
            Err(e) => {
                tracing::debug!(error = %e, "Payload snapshot failed, storing sentinel");
                PayloadSnapshot::Unclonable
            }
        }
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            PayloadSnapshot::Value(value) => Some(value),
            PayloadSnapshot::Unclonable => None,
        }
    }

    pub fn is_unclonable(&self) -> bool {
        matches!(self, PayloadSnapshot::Unclonable)
    }
}

/// One emitted event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub event: String,
    pub payload: PayloadSnapshot,
    pub timestamp: DateTime<Local>,
}

impl HistoryEntry {
    pub fn new(event: impl Into<String>, payload: PayloadSnapshot) -> Self {
        Self {
            event: event.into(),
            payload,
            timestamp: Local::now(),
        }
    }
}
