use std::time::Duration;

use async_trait::async_trait;
use core_model::{Event, TimeWindow};
use thiserror::Error;

/// Failure of a single window query.
///
/// Only `DeadlineExceeded` and `Cancelled` are tolerated by the tail loop;
/// every other variant ends the stream.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query did not finish within {0:?}")]
    DeadlineExceeded(Duration),
    #[error("query was cancelled")]
    Cancelled,
    #[error("not authorized to query dataset: {0}")]
    Unauthorized(String),
    #[error("query returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to reach the query endpoint: {0}")]
    Transport(String),
    #[error("failed to decode query response: {0}")]
    Decode(String),
}

impl QueryError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, QueryError::DeadlineExceeded(_) | QueryError::Cancelled)
    }
}

/// Runs one time-bounded query against a dataset.
///
/// Implementations return matches in non-decreasing timestamp order.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(
        &self,
        dataset: &str,
        window: &TimeWindow,
        deadline: Duration,
    ) -> Result<Vec<Event>, QueryError>;
}
