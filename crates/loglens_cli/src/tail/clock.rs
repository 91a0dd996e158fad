use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

/// Wall-clock time that never runs backwards.
///
/// The wall clock is read once; afterwards time advances with tokio's
/// monotonic `Instant`, so a stepped system clock cannot hand the window
/// tracker a `now` earlier than the previous one.
#[derive(Debug, Clone, Copy)]
pub struct TailClock {
    anchor: DateTime<Utc>,
    started: Instant,
}

impl TailClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    pub fn anchored_at(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            started: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed =
            Duration::from_std(self.started.elapsed()).unwrap_or_else(|_| Duration::zero());
        self.anchor + elapsed
    }
}

impl Default for TailClock {
    fn default() -> Self {
        Self::new()
    }
}
