use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::RequestBuilder;

use super::types::{CONNECT_TIMEOUT_SECS, ORG_ID_HEADER};
use crate::config::Config;

pub struct ApiClient {
    pub(super) http: reqwest::Client,
    pub(super) base_url: String,
    pub(super) token: String,
    pub(super) org_id: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_credentials(
            &config.url,
            &config.token,
            config.org_id.as_deref(),
            config.insecure,
        )
    }

    pub fn with_credentials(
        url: &str,
        token: &str,
        org_id: Option<&str>,
        insecure: bool,
    ) -> Result<Self> {
        let base_url = url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            anyhow::bail!("deployment url must not be empty");
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .danger_accept_invalid_certs(insecure)
            .user_agent(concat!("loglens/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            token: token.to_owned(),
            org_id: org_id.map(str::to_owned),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(super) fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.bearer_auth(&self.token);
        match &self.org_id {
            Some(org_id) => builder.header(ORG_ID_HEADER, org_id),
            None => builder,
        }
    }
}
