//! Replayable request templates
//!
//! A `FetchTemplate` is the part of an observed browser request that is
//! needed to issue the same call again over plain HTTP: the URL, the method
//! and the authenticated header set.

use crate::CaptureError;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// A request as observed in the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRequest {
    pub url: String,
    pub method: String,
    /// Header name/value pairs in the order the browser reported them
    pub headers: Vec<(String, String)>,
}

/// A response as observed in the browser, with the request that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedResponse {
    pub url: String,
    pub status: u16,
    pub request: ObservedRequest,
    /// Response body, when the session captured one
    pub body: Option<String>,
}

impl ObservedResponse {
    /// Returns true for a 2xx status
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A captured, replayable HTTP request description
///
/// Immutable once captured. Sibling endpoints that share the same
/// authentication are derived with [`FetchTemplate::with_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTemplate {
    url: Url,
    method: Method,
    headers: Vec<(String, String)>,
}

impl FetchTemplate {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns a template for another URL that reuses these headers
    pub fn with_url(&self, url: Url) -> FetchTemplate {
        FetchTemplate {
            url,
            method: self.method.clone(),
            headers: self.headers.clone(),
        }
    }

    /// Returns the first value of a query parameter on the template URL
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Returns the template URL with one query parameter replaced
    ///
    /// All other parameters keep their original order.
    pub fn url_with_query_param(&self, name: &str, value: &str) -> Url {
        let pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(key, existing)| {
                if key == name {
                    (key.into_owned(), value.to_string())
                } else {
                    (key.into_owned(), existing.into_owned())
                }
            })
            .collect();

        let mut url = self.url.clone();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        url
    }
}

/// Turns an observed browser request into a replayable template
///
/// HTTP/2 pseudo-headers (names starting with `:`) are dropped. Only GET
/// requests are accepted; replaying any other method would mean guessing
/// at its body semantics.
///
/// # Errors
///
/// * `CaptureError::UnsupportedMethod` - the request is not a GET
/// * `CaptureError::InvalidUrl` - the request URL does not parse
pub fn extract_fetch_template(request: &ObservedRequest) -> Result<FetchTemplate, CaptureError> {
    if !request.method.eq_ignore_ascii_case("GET") {
        return Err(CaptureError::UnsupportedMethod(request.method.clone()));
    }

    let url = Url::parse(&request.url)
        .map_err(|e| CaptureError::InvalidUrl(format!("{}: {}", request.url, e)))?;

    let headers: Vec<(String, String)> = request
        .headers
        .iter()
        .filter(|(name, _)| !name.starts_with(':'))
        .cloned()
        .collect();

    tracing::debug!(
        "Extracted fetch template for {} with headers: {:?}",
        url,
        headers.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>()
    );

    Ok(FetchTemplate {
        url,
        method: Method::GET,
        headers,
    })
}
