//! Live tail of a remote dataset.
//!
//! A [`TailLoop`] asks a [`QueryClient`] for one [`WindowTracker`] window per
//! tick and hands the matches to an [`EventEmitter`]. Windows are contiguous,
//! the bound only moves past events that were emitted, and at most one query
//! is in flight.

mod clock;
mod emitter;
mod poll;
mod query;
mod window;

pub use clock::TailClock;
pub use emitter::{render_line, EventEmitter};
pub use poll::{TailLoop, TailOptions, TailSummary};
pub use query::{QueryClient, QueryError};
pub use window::WindowTracker;
