//! Configuration module for Order-Replay
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use order_replay::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Rate limit: {} per {}ms", config.rate_limit.rps, config.rate_limit.time_unit_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, EndpointConfig, FetchSettings, OutputConfig, RateLimitConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::{INVOICE_ID_PLACEHOLDER, ORDER_NUMBER_PLACEHOLDER};
