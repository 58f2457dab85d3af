//! Direct HTTP replay of captured requests
//!
//! This module handles all outbound HTTP for a run, including:
//! - Building the HTTP client
//! - Converting template headers into a request header map
//! - Acquiring a rate limiter permit before every request
//! - Status checking and tolerant JSON decoding

use crate::capture::FetchTemplate;
use crate::limiter::RateLimiter;
use crate::ReplayError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Headers the HTTP client manages itself and must not be copied from the
/// browser
const CLIENT_MANAGED_HEADERS: [&str; 5] = [
    "accept-encoding",
    "connection",
    "content-length",
    "host",
    "transfer-encoding",
];

/// Builds the HTTP client used for replayed requests
///
/// No user agent is set here; the browser's own `user-agent` header is
/// part of every fetch template.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Converts template headers into a reqwest header map
pub fn template_headers(template: &FetchTemplate) -> Result<HeaderMap, ReplayError> {
    let mut headers = HeaderMap::new();

    for (name, value) in template.headers() {
        let lowered = name.to_ascii_lowercase();
        if CLIENT_MANAGED_HEADERS.contains(&lowered.as_str()) {
            continue;
        }

        let header_name = HeaderName::from_bytes(lowered.as_bytes())
            .map_err(|_| ReplayError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| ReplayError::InvalidHeader(name.clone()))?;
        headers.append(header_name, header_value);
    }

    Ok(headers)
}

/// Issues replayed GET requests behind the shared rate limiter
///
/// Every request made through a `Replayer` acquires exactly one permit
/// before it is sent. Cloning is cheap; clones share the client and limiter.
#[derive(Debug, Clone)]
pub struct Replayer {
    client: Client,
    limiter: Arc<RateLimiter>,
}

impl Replayer {
    pub fn new(client: Client, limiter: Arc<RateLimiter>) -> Self {
        Self { client, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Replays the template's headers against `url` and returns the body
    ///
    /// # Errors
    ///
    /// * `ReplayError::InvalidHeader` - a template header cannot be sent
    /// * `ReplayError::Http` - the request failed at the transport level
    /// * `ReplayError::Status` - the response status is not a success
    pub async fn get_text(&self, template: &FetchTemplate, url: &Url) -> Result<String, ReplayError> {
        let headers = template_headers(template)?;

        self.limiter.acquire().await;
        tracing::debug!(">> GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|source| ReplayError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        tracing::debug!("<< {} {}", status.as_u16(), url);

        if !status.is_success() {
            return Err(ReplayError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| ReplayError::Http {
            url: url.to_string(),
            source,
        })
    }

    /// Replays a request and parses the body as JSON
    ///
    /// An empty, `null` or unparseable body yields `Ok(None)` rather than an
    /// error; callers decide what an absent payload means.
    pub async fn get_json(
        &self,
        template: &FetchTemplate,
        url: &Url,
    ) -> Result<Option<Value>, ReplayError> {
        let body = self.get_text(template, url).await?;
        Ok(parse_json_no_throw(url, &body))
    }
}

/// Parses a response body, logging and discarding anything that is not JSON
pub fn parse_json_no_throw(url: &Url, body: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Error parsing JSON from {}: {}", url, e);
            None
        }
    }
}
