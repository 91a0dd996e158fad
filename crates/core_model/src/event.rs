use chrono::{DateTime, Utc};

/// A single matched record returned by a dataset query.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Ingest time of the record as reported by the service.
    pub timestamp: DateTime<Utc>,
    /// The record itself; opaque to the client.
    pub payload: serde_json::Value,
}

impl Event {
    pub fn new(timestamp: DateTime<Utc>, payload: serde_json::Value) -> Self {
        Self { timestamp, payload }
    }
}

/// Timestamp of the last event in a batch.
///
/// Batches arrive in non-decreasing timestamp order, so the last element is
/// the newest one.
pub fn latest_timestamp(events: &[Event]) -> Option<DateTime<Utc>> {
    events.last().map(|event| event.timestamp)
}
