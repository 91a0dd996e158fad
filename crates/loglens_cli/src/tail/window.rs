use chrono::{DateTime, Utc};
use core_model::{epsilon, just_after, TimeWindow};

/// Hands out contiguous query windows and remembers how far output has
/// progressed.
///
/// Everything strictly before `bound` has already been emitted. The bound
/// only moves forward, and only past timestamps that were actually returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowTracker {
    bound: DateTime<Utc>,
}

impl WindowTracker {
    /// Starts tailing from "just before now".
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::starting_at(now - epsilon())
    }

    /// Tracker whose first window opens exactly at `bound`.
    pub fn starting_at(bound: DateTime<Utc>) -> Self {
        Self { bound }
    }

    pub fn bound(&self) -> DateTime<Utc> {
        self.bound
    }

    /// Window from the current bound up to `now`.
    ///
    /// When the service is ahead of the local clock (`now <= bound`) the end
    /// is clamped to one step past the bound so the window is never empty.
    pub fn next(&self, now: DateTime<Utc>) -> TimeWindow {
        let start = self.bound;
        TimeWindow::new(start, now).unwrap_or(TimeWindow {
            start,
            end: just_after(start),
        })
    }

    /// Moves the bound strictly past `latest_seen`. `None` leaves it alone so
    /// the next window re-covers the same start.
    pub fn advance(&mut self, latest_seen: Option<DateTime<Utc>>) {
        if let Some(ts) = latest_seen {
            let candidate = just_after(ts);
            if candidate > self.bound {
                self.bound = candidate;
            }
        }
    }
}
