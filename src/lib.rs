//! Order-Replay: authenticated order history retrieval by request replay
//!
//! This crate captures one authenticated API exchange from a browser session,
//! turns it into a replayable request template, and then fetches the full
//! order and invoice history over plain HTTP behind a shared rate limiter.
//! Follow-up fetches per order run through a bounded-retry action queue.

pub mod capture;
pub mod config;
pub mod harvest;
pub mod history;
pub mod limiter;
pub mod output;
pub mod queue;
pub mod replay;
pub mod schema;

use thiserror::Error;

/// Main error type for Order-Replay operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Order history error: {0}")]
    History(#[from] HistoryError),

    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("Action queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Unexpected payload from {url}: {message}")]
    Payload { url: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while capturing a request template from a browser exchange
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Response from endpoint is not OK. Endpoint: {endpoint}. Response status: {status}")]
    NotOk { endpoint: String, status: u16 },

    #[error("Unsupported request method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid captured URL: {0}")]
    InvalidUrl(String),

    #[error("Navigation ended before a response from {endpoint} was observed")]
    NavigationEnded { endpoint: String },

    #[error("Failed to load recorded exchanges: {0}")]
    Recording(String),
}

/// Errors raised by the paginated order history fetch
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Captured request is missing the '{0}' query parameter")]
    MissingQueryParam(&'static str),

    #[error("Query parameter '{name}' is not a positive integer: {value}")]
    InvalidQueryParam { name: &'static str, value: String },

    #[error("Captured request must be for page 1, got page {0}")]
    NotFirstPage(u32),

    #[error("Captured request has a page size of zero")]
    InvalidPageSize,
}

/// Errors raised when replaying a request over plain HTTP
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid header '{0}' in fetch template")]
    InvalidHeader(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Contract violations inside the action queue driver
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Completion was signalled without a registered resolver")]
    MissingResolver,

    #[error("Queue driver stopped before signalling completion")]
    DriverPanicked,
}

/// Result type alias for Order-Replay operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use capture::{get_fetch_config, BrowserSession, CapturedFetchConfig, FetchTemplate};
pub use config::Config;
pub use harvest::{HarvestReport, Harvester};
pub use limiter::RateLimiter;
pub use queue::{ActionQueue, ActionQueueItem, QueueOutcome};
pub use schema::{validate, PayloadKind, Validation};
