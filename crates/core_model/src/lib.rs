//! Domain types shared by the live-tail engine and the command-line client.

pub mod event;
pub mod output;
pub mod time;

pub use event::{latest_timestamp, Event};
pub use output::OutputMode;
pub use time::{epsilon, just_after, TimeWindow, EPSILON_NANOS};
