//! Fetch template capture from a browser session

use super::tap::ResponseTap;
use super::template::{extract_fetch_template, FetchTemplate, ObservedResponse};
use crate::CaptureError;
use async_trait::async_trait;
use url::Url;

/// An authenticated browser session
///
/// Launching the browser, logging in and persisting cookies all happen
/// outside this crate. A session only has to navigate and publish the
/// responses it observes to its [`ResponseTap`].
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// The tap this session publishes observed responses to
    fn response_tap(&self) -> &ResponseTap;

    /// Navigates to a URL and returns the navigation response, if any
    async fn goto(&self, url: &str) -> Result<Option<ObservedResponse>, CaptureError>;
}

/// Matches responses by host and path equality with an endpoint URL
///
/// The query string is ignored so that any page of a paged endpoint
/// matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMatcher {
    host: String,
    port: Option<u16>,
    path: String,
}

impl EndpointMatcher {
    pub fn new(endpoint: &Url) -> Self {
        Self {
            host: endpoint.host_str().unwrap_or_default().to_lowercase(),
            port: endpoint.port(),
            path: endpoint.path().to_string(),
        }
    }

    /// Returns true if the URL has the same host, port and path
    pub fn matches(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(candidate) => {
                candidate.host_str().map(str::to_lowercase).as_deref() == Some(self.host.as_str())
                    && candidate.port() == self.port
                    && candidate.path() == self.path
            }
            Err(_) => false,
        }
    }
}

/// The result of capturing a fetch template
#[derive(Debug, Clone)]
pub struct CapturedFetchConfig {
    /// The replayable request
    pub template: FetchTemplate,

    /// The API response the template was captured from
    pub api_response: ObservedResponse,

    /// The response to the page navigation itself
    pub browser_response: Option<ObservedResponse>,
}

/// Captures the request the browser makes to `endpoint_url` while loading
/// `browser_url`
///
/// # Capture Flow
///
/// 1. Register a host + path matcher on the session's response tap
/// 2. Navigate to `browser_url`
/// 3. Await the first matching response within the navigation's lifetime
/// 4. Reject non-2xx responses
/// 5. Extract the template from the response's request
///
/// # Errors
///
/// * `CaptureError::InvalidUrl` - `endpoint_url` does not parse
/// * `CaptureError::NavigationEnded` - no matching response was observed
/// * `CaptureError::NotOk` - the matching response was not a success
/// * `CaptureError::UnsupportedMethod` - the captured request is not a GET
pub async fn get_fetch_config(
    session: &dyn BrowserSession,
    browser_url: &str,
    endpoint_url: &str,
) -> Result<CapturedFetchConfig, CaptureError> {
    tracing::info!("Getting fetch config for endpoint: {}", endpoint_url);

    let endpoint = Url::parse(endpoint_url)
        .map_err(|e| CaptureError::InvalidUrl(format!("{}: {}", endpoint_url, e)))?;
    let matcher = EndpointMatcher::new(&endpoint);

    // Register before navigating so the response cannot be missed
    let pending = session
        .response_tap()
        .wait_for(move |response| matcher.matches(&response.url));

    let browser_response = session.goto(browser_url).await?;

    let api_response = pending.await.ok_or_else(|| CaptureError::NavigationEnded {
        endpoint: endpoint_url.to_string(),
    })?;

    if !api_response.ok() {
        return Err(CaptureError::NotOk {
            endpoint: endpoint_url.to_string(),
            status: api_response.status,
        });
    }

    let template = extract_fetch_template(&api_response.request)?;
    tracing::info!("Captured fetch template: {} {}", template.method(), template.url());

    Ok(CapturedFetchConfig {
        template,
        api_response,
        browser_response,
    })
}
