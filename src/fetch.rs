//! Report API client
//!
//! [`ReportFetcher`] is the seam between the task runner and the network: one
//! call performs one POST and returns the complete response, or an error when
//! the round trip could not be completed. HTTP error statuses are responses,
//! not errors; deciding what they mean is the classifier's job.

use crate::config::HttpConfig;
use crate::error::Result;
use crate::task::ReportRequest;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::time::Duration;

/// A complete response from the report API
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status
    pub status: StatusCode,
    /// All response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// Status line in `"<code> <reason>"` form, e.g. `"202 Accepted"`
    pub fn status_line(&self) -> String {
        match self.status.canonical_reason() {
            Some(reason) => format!("{} {}", self.status.as_u16(), reason),
            None => self.status.as_u16().to_string(),
        }
    }
}

/// Performs one report request
#[async_trait]
pub trait ReportFetcher: Send + Sync {
    /// POST the request and read the whole response
    ///
    /// Connection failures, timeouts and unreadable bodies are errors.
    async fn fetch(&self, request: &ReportRequest) -> Result<RawResponse>;
}

/// [`ReportFetcher`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpReportClient {
    client: reqwest::Client,
    url: String,
}

impl HttpReportClient {
    /// Create a client posting to `url`, with an overall per-request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Create a client from the `[http]` configuration section
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Self::new(config.reports_url.clone(), config.timeout)
    }

    /// Endpoint this client posts to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReportFetcher for HttpReportClient {
    async fn fetch(&self, request: &ReportRequest) -> Result<RawResponse> {
        let response = self
            .client
            .post(&self.url)
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        tracing::debug!(
            url = %self.url,
            status = status.as_u16(),
            body_len = body.len(),
            "report API responded"
        );

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
