//! Browser session backed by recorded exchanges
//!
//! Lets a run start from a capture file exported from the browser's
//! developer tools instead of a live browser. Every navigation replays the
//! whole recording into the response tap and then ends the navigation.

use super::extractor::BrowserSession;
use super::tap::ResponseTap;
use super::template::{ObservedRequest, ObservedResponse};
use crate::CaptureError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One exchange in a capture file
#[derive(Debug, Deserialize)]
struct RecordedExchange {
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: RecordedHeaders,
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    body: Option<serde_json::Value>,
}

/// Request headers of a recorded exchange
///
/// Either a HAR-style list of `{"name", "value"}` entries, which keeps the
/// browser's order and repeated headers, or an object whose values are a
/// string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordedHeaders {
    List(Vec<RecordedHeader>),
    Map(BTreeMap<String, HeaderValues>),
}

impl Default for RecordedHeaders {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct RecordedHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl RecordedHeaders {
    fn into_pairs(self) -> Vec<(String, String)> {
        match self {
            Self::List(headers) => headers
                .into_iter()
                .map(|header| (header.name, header.value))
                .collect(),
            Self::Map(headers) => headers
                .into_iter()
                .flat_map(|(name, values)| {
                    let values = match values {
                        HeaderValues::One(value) => vec![value],
                        HeaderValues::Many(values) => values,
                    };
                    values.into_iter().map(move |value| (name.clone(), value))
                })
                .collect(),
        }
    }
}

/// Top-level layout of a capture file
#[derive(Debug, Deserialize)]
struct Recording {
    exchanges: Vec<RecordedExchange>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

impl From<RecordedExchange> for ObservedResponse {
    fn from(exchange: RecordedExchange) -> Self {
        ObservedResponse {
            url: exchange.url.clone(),
            status: exchange.status,
            request: ObservedRequest {
                url: exchange.url,
                method: exchange.method,
                headers: exchange.headers.into_pairs(),
            },
            body: exchange.body.map(|value| value.to_string()),
        }
    }
}

/// A [`BrowserSession`] that replays a fixed set of observed responses
pub struct RecordedSession {
    tap: ResponseTap,
    exchanges: Vec<ObservedResponse>,
}

impl RecordedSession {
    pub fn new(exchanges: Vec<ObservedResponse>) -> Self {
        Self {
            tap: ResponseTap::new(),
            exchanges,
        }
    }

    /// Loads a capture file
    ///
    /// ```json
    /// {"exchanges": [{"url": "...", "method": "GET", "headers": {"cookie": "..."}, "status": 200}]}
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, CaptureError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CaptureError::Recording(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parses capture file content
    pub fn from_json(content: &str) -> Result<Self, CaptureError> {
        let recording: Recording =
            serde_json::from_str(content).map_err(|e| CaptureError::Recording(e.to_string()))?;

        if recording.exchanges.is_empty() {
            return Err(CaptureError::Recording(
                "recording contains no exchanges".to_string(),
            ));
        }

        Ok(Self::new(
            recording.exchanges.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }
}

#[async_trait]
impl BrowserSession for RecordedSession {
    fn response_tap(&self) -> &ResponseTap {
        &self.tap
    }

    async fn goto(&self, url: &str) -> Result<Option<ObservedResponse>, CaptureError> {
        tracing::debug!(
            "Replaying {} recorded exchange(s) for navigation to {}",
            self.exchanges.len(),
            url
        );

        for exchange in &self.exchanges {
            tracing::debug!("<< {} {}", exchange.status, exchange.url);
            self.tap.publish(exchange);
        }
        self.tap.end_navigation();

        Ok(Some(ObservedResponse {
            url: url.to_string(),
            status: 200,
            request: ObservedRequest {
                url: url.to_string(),
                method: "GET".to_string(),
                headers: Vec::new(),
            },
            body: None,
        }))
    }
}
