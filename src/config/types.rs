use serde::Deserialize;

/// Main configuration structure for Order-Replay
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub fetch: FetchSettings,
    pub endpoints: EndpointConfig,
    pub output: OutputConfig,
}

/// Rate limiter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Permits granted per time unit
    pub rps: u32,

    /// Length of the time unit (milliseconds)
    #[serde(rename = "time-unit-ms", default = "default_time_unit_ms")]
    pub time_unit_ms: u64,

    /// Space calls evenly instead of bursting up to `rps` at once
    #[serde(rename = "uniform-distribution", default)]
    pub uniform_distribution: bool,
}

/// Order and retry settings
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    /// Number of order history entries to assemble
    #[serde(rename = "order-count")]
    pub order_count: u32,

    /// Maximum attempts per order follow-up action
    #[serde(rename = "attempts-limit", default = "default_attempts_limit")]
    pub attempts_limit: u32,

    /// Timeout for each replayed HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Upstream endpoints
///
/// Per-order endpoints are templates with `{order_number}` and
/// `{invoice_id}` placeholders.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Page the browser navigates to in order to trigger the history call
    #[serde(rename = "browser-url")]
    pub browser_url: String,

    /// Paged order history endpoint to capture
    #[serde(rename = "order-history")]
    pub order_history: String,

    #[serde(rename = "invoice-overview")]
    pub invoice_overview: String,

    #[serde(rename = "invoice-detail")]
    pub invoice_detail: String,

    #[serde(rename = "order-aggregations")]
    pub order_aggregations: String,

    /// Fetch each invoice listed in an order's overview
    #[serde(rename = "fetch-invoice-details", default = "default_true")]
    pub fetch_invoice_details: bool,

    /// Fetch the aggregation summary for each order
    #[serde(rename = "fetch-aggregations", default = "default_true")]
    pub fetch_aggregations: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory the JSON result files are written to
    pub directory: String,
}

fn default_time_unit_ms() -> u64 {
    1000
}

fn default_attempts_limit() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
