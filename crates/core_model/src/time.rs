use chrono::{DateTime, Duration, Utc};

/// Smallest step, in nanoseconds, between two distinguishable timestamps.
///
/// Timestamps come back as RFC 3339 strings with nanosecond fractions, so a
/// single nanosecond is the finest step that never skips a representable
/// instant.
pub const EPSILON_NANOS: i64 = 1;

pub fn epsilon() -> Duration {
    Duration::nanoseconds(EPSILON_NANOS)
}

/// Half-open interval `[start, end)` queried as one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Builds a window, returning `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start && *ts < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Returns the first instant strictly after `ts`.
pub fn just_after(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts + epsilon()
}
