use std::io::Write;
use std::time::Duration;

use core_model::{latest_timestamp, Event, TimeWindow};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::clock::TailClock;
use super::emitter::EventEmitter;
use super::query::{QueryClient, QueryError};
use super::window::WindowTracker;

#[derive(Debug, Clone)]
pub struct TailOptions {
    pub dataset: String,
    /// Cadence between queries. Also the deadline of each query.
    pub interval: Duration,
}

impl TailOptions {
    pub fn new(dataset: impl Into<String>, interval: Duration) -> Self {
        Self {
            dataset: dataset.into(),
            interval,
        }
    }
}

/// Counters reported when a tail stops cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailSummary {
    pub queries: u64,
    pub empty_windows: u64,
    pub recovered_failures: u64,
    pub events: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TailState {
    Idle,
    Querying,
    Emitting,
    Waiting,
    Stopped,
}

/// Sequential poll loop: one window query per tick, results forwarded in
/// order, bound advanced only after a successful query.
pub struct TailLoop<'a, Q: ?Sized, W> {
    client: &'a Q,
    emitter: EventEmitter<W>,
    tracker: WindowTracker,
    clock: TailClock,
    options: TailOptions,
    state: TailState,
    summary: TailSummary,
}

impl<'a, Q, W> TailLoop<'a, Q, W>
where
    Q: QueryClient + ?Sized,
    W: Write,
{
    pub fn new(client: &'a Q, emitter: EventEmitter<W>, options: TailOptions) -> Self {
        Self::with_clock(client, emitter, options, TailClock::new())
    }

    pub fn with_clock(
        client: &'a Q,
        emitter: EventEmitter<W>,
        options: TailOptions,
        clock: TailClock,
    ) -> Self {
        Self {
            client,
            emitter,
            tracker: WindowTracker::new(clock.now()),
            clock,
            options,
            state: TailState::Idle,
            summary: TailSummary::default(),
        }
    }

    /// Tails until `cancel` turns true or a query fails for a reason other
    /// than its own deadline.
    ///
    /// A dropped sender is treated as "never cancelled".
    pub async fn run(
        mut self,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<TailSummary, QueryError> {
        let mut ticker = time::interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            dataset = %self.options.dataset,
            interval_ms = self.options.interval.as_millis() as u64,
            format = %self.emitter.mode(),
            "starting live tail"
        );

        loop {
            self.transition(TailState::Waiting);
            tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => break,
                _ = ticker.tick() => {}
            }

            self.transition(TailState::Querying);
            let window = self.tracker.next(self.clock.now());
            let outcome = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => break,
                result = self.query(&window) => result,
            };
            self.summary.queries += 1;

            match outcome {
                Ok(events) => {
                    self.transition(TailState::Emitting);
                    self.forward(&window, events);
                }
                Err(err) if err.is_recoverable() => {
                    self.summary.recovered_failures += 1;
                    debug!(
                        start = %window.start,
                        end = %window.end,
                        "no results this tick: {err}"
                    );
                }
                Err(err) => {
                    self.transition(TailState::Stopped);
                    warn!(dataset = %self.options.dataset, "live tail stopped: {err}");
                    return Err(err);
                }
            }
        }

        self.transition(TailState::Stopped);
        info!(
            dataset = %self.options.dataset,
            events = self.summary.events,
            queries = self.summary.queries,
            written = self.emitter.written(),
            dropped = self.emitter.dropped(),
            "live tail cancelled"
        );
        Ok(self.summary)
    }

    async fn query(&self, window: &TimeWindow) -> Result<Vec<Event>, QueryError> {
        let deadline = self.options.interval;
        match time::timeout(
            deadline,
            self.client.query(&self.options.dataset, window, deadline),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(QueryError::DeadlineExceeded(deadline)),
        }
    }

    fn forward(&mut self, window: &TimeWindow, events: Vec<Event>) {
        debug!(
            start = %window.start,
            end = %window.end,
            span_ms = window.duration().num_milliseconds(),
            matches = events.len(),
            "window queried"
        );
        if events.is_empty() {
            self.summary.empty_windows += 1;
            return;
        }

        self.tracker.advance(latest_timestamp(&events));
        for event in &events {
            self.emitter.emit(event);
        }
        self.summary.events += events.len() as u64;
    }

    fn transition(&mut self, next: TailState) {
        trace!(from = ?self.state, to = ?next, "tail state");
        self.state = next;
    }
}

/// Resolves once cancellation is requested; pends forever if the sender is
/// gone without having requested it.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let closed = cancel.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
