use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use core_model::{Event, TimeWindow};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::client::ApiClient;
use super::types::{
    Dataset, ErrorResponse, Organization, QueryMatch, QueryRequest, QueryResponse, User,
    CURRENT_USER_PATH, DATASETS_PATH, DEFAULT_RETRY_AFTER_SECS, ORGANIZATIONS_PATH,
};
use crate::tail::{QueryClient, QueryError};

const MAX_RATE_LIMIT_RETRIES: u32 = 3;

impl ApiClient {
    /// Names of all datasets visible to the token, sorted.
    pub async fn list_datasets(&self) -> Result<Vec<String>> {
        let response = self
            .execute_request(self.http.get(self.url(DATASETS_PATH)), "list datasets")
            .await?;
        let datasets: Vec<Dataset> = response
            .json()
            .await
            .context("Failed to parse dataset list response")?;

        let mut names: Vec<String> = datasets.into_iter().map(|d| d.name).collect();
        names.sort();
        Ok(names)
    }

    pub async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let response = self
            .execute_request(
                self.http.get(self.url(ORGANIZATIONS_PATH)),
                "list organizations",
            )
            .await?;
        response
            .json()
            .await
            .context("Failed to parse organization list response")
    }

    pub async fn current_user(&self) -> Result<User> {
        let response = self
            .execute_request(self.http.get(self.url(CURRENT_USER_PATH)), "fetch current user")
            .await?;
        response
            .json()
            .await
            .context("Failed to parse current user response")
    }

    /// Queries `window` of `dataset`, giving up after `deadline`.
    pub async fn query_window(
        &self,
        dataset: &str,
        window: &TimeWindow,
        deadline: Duration,
    ) -> Result<Vec<Event>, QueryError> {
        let url = self.query_url(dataset)?;
        let body = QueryRequest {
            start_time: window.start.to_rfc3339_opts(SecondsFormat::Nanos, true),
            end_time: window.end.to_rfc3339_opts(SecondsFormat::Nanos, true),
        };
        let streaming_duration = format!("{}ms", deadline.as_millis());

        let response = self
            .authorized(self.http.post(url))
            .query(&[("streaming-duration", streaming_duration.as_str())])
            .timeout(deadline)
            .json(&body)
            .send()
            .await
            .map_err(|err| classify_transport_error(err, deadline))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|err| classify_transport_error(err, deadline))?;
        debug!(dataset, matches = parsed.matches.len(), "query window returned");
        Ok(into_events(parsed.matches))
    }

    fn query_url(&self, dataset: &str) -> Result<Url, QueryError> {
        let mut url = Url::parse(&self.url(DATASETS_PATH))
            .map_err(|err| QueryError::Transport(format!("invalid deployment url: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| QueryError::Transport("deployment url cannot be a base".to_owned()))?
            .push(dataset)
            .push("query");
        Ok(url)
    }

    async fn execute_request(&self, builder: RequestBuilder, label: &str) -> Result<Response> {
        let base_builder = self.authorized(builder);
        let mut attempts = 0;

        loop {
            let request = base_builder
                .try_clone()
                .context("Unable to clone request for retry")?;

            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to {label}"))?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS
                && attempts < MAX_RATE_LIMIT_RETRIES
            {
                attempts += 1;
                let wait = retry_after(&response);
                warn!(
                    "Rate limited on {label}. Waiting {}s before retrying...",
                    wait.as_secs()
                );
                sleep(wait).await;
                continue;
            }

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(error_for_status(status, &body)).context(format!("Failed to {label}"));
            }

            return Ok(response);
        }
    }
}

#[async_trait]
impl QueryClient for ApiClient {
    async fn query(
        &self,
        dataset: &str,
        window: &TimeWindow,
        deadline: Duration,
    ) -> Result<Vec<Event>, QueryError> {
        self.query_window(dataset, window, deadline).await
    }
}

fn into_events(matches: Vec<QueryMatch>) -> Vec<Event> {
    matches
        .into_iter()
        .map(|m| Event::new(m.time, m.data))
        .collect()
}

/// Only a timeout of the request itself counts as the query's deadline. A
/// connect failure, including the client's connect timeout, is a transport
/// error.
fn classify_transport_error(err: reqwest::Error, deadline: Duration) -> QueryError {
    if err.is_connect() {
        QueryError::Transport(err.to_string())
    } else if err.is_timeout() {
        QueryError::DeadlineExceeded(deadline)
    } else if err.is_decode() {
        QueryError::Decode(err.to_string())
    } else {
        QueryError::Transport(err.to_string())
    }
}

pub(crate) fn error_for_status(status: StatusCode, body: &str) -> QueryError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|resp| resp.message)
        .unwrap_or_else(|| body.trim().to_owned());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => QueryError::Unauthorized(message),
        _ => QueryError::Status {
            status: status.as_u16(),
            body: message,
        },
    }
}

fn retry_after(response: &Response) -> Duration {
    response
        .headers()
        .get("Retry-After")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_RETRY_AFTER_SECS))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    /// Client that bypasses any proxy from the environment.
    fn direct_client() -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(Duration::from_millis(200))
            .build()
            .unwrap()
    }

    async fn refused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn connect_failures_are_fatal_transport_errors() {
        let port = refused_port().await;
        let deadline = Duration::from_secs(20);
        let err = direct_client()
            .get(format!("http://127.0.0.1:{port}/"))
            .timeout(deadline)
            .send()
            .await
            .unwrap_err();

        let classified = classify_transport_error(err, deadline);
        assert!(matches!(classified, QueryError::Transport(_)));
        assert!(!classified.is_recoverable());
    }

    #[tokio::test]
    async fn connect_timeout_is_not_the_query_deadline() {
        // Non-routable address: the connect attempt hangs until the client's
        // connect timeout fires, well before the request deadline.
        let deadline = Duration::from_secs(20);
        let err = direct_client()
            .get("http://10.255.255.1:81/")
            .timeout(deadline)
            .send()
            .await
            .unwrap_err();

        assert!(err.is_connect());
        let classified = classify_transport_error(err, deadline);
        assert!(!classified.is_recoverable());
    }

    #[tokio::test]
    async fn slow_response_hits_the_query_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            // Accept and hold the connection without ever answering.
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let deadline = Duration::from_millis(100);
        let err = direct_client()
            .get(format!("http://127.0.0.1:{port}/"))
            .timeout(deadline)
            .send()
            .await
            .unwrap_err();
        server.abort();

        let classified = classify_transport_error(err, deadline);
        assert!(matches!(classified, QueryError::DeadlineExceeded(d) if d == deadline));
        assert!(classified.is_recoverable());
    }

    #[test]
    fn maps_auth_statuses_to_unauthorized() {
        let err = error_for_status(StatusCode::FORBIDDEN, r#"{"message":"token expired"}"#);
        assert!(matches!(err, QueryError::Unauthorized(ref msg) if msg == "token expired"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn other_statuses_keep_code_and_body() {
        let err = error_for_status(StatusCode::BAD_GATEWAY, " upstream down \n");
        match err {
            QueryError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn decodes_matches_in_response_order() {
        let raw = json!({
            "status": {"elapsedTime": 12},
            "matches": [
                {
                    "_time": "2024-05-01T10:00:00.000000001Z",
                    "_rowId": "a",
                    "data": {"msg": "first"}
                },
                {"_time": "2024-05-01T10:00:01Z", "data": {"msg": "second"}}
            ]
        });
        let parsed: QueryResponse = serde_json::from_value(raw).unwrap();
        let events = into_events(parsed.matches);

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].timestamp,
            Utc.timestamp_opt(1_714_557_600, 1).unwrap()
        );
        assert_eq!(events[0].payload, json!({"msg": "first"}));
        assert_eq!(events[1].payload["msg"], "second");
    }

    #[test]
    fn missing_matches_mean_an_empty_window() {
        let parsed: QueryResponse = serde_json::from_value(json!({})).unwrap();
        assert!(into_events(parsed.matches).is_empty());
    }

    #[test]
    fn dataset_name_is_escaped_into_one_path_segment() {
        let client =
            ApiClient::with_credentials("https://logs.example.com", "tok", None, false).unwrap();
        let url = client.query_url("web logs/prod").unwrap();
        assert_eq!(
            url.as_str(),
            "https://logs.example.com/v1/datasets/web%20logs%2Fprod/query"
        );
    }

    #[test]
    fn window_bounds_serialize_with_nanoseconds() {
        let body = QueryRequest {
            start_time: Utc
                .timestamp_opt(0, 1)
                .unwrap()
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            end_time: Utc
                .timestamp_opt(2, 0)
                .unwrap()
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["startTime"], "1970-01-01T00:00:00.000000001Z");
        assert_eq!(value["endTime"], "1970-01-01T00:00:02.000000000Z");
    }
}
