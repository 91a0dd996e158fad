use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DATASETS_PATH: &str = "/v1/datasets";
pub const ORGANIZATIONS_PATH: &str = "/v1/orgs";
pub const CURRENT_USER_PATH: &str = "/v1/user";
pub const ORG_ID_HEADER: &str = "X-Org-Id";
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct QueryRequest {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct QueryResponse {
    #[serde(default)]
    pub matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
pub(super) struct QueryMatch {
    #[serde(rename = "_time")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
}
