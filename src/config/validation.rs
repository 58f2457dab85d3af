use crate::config::types::{Config, EndpointConfig, FetchSettings, OutputConfig, RateLimitConfig};
use crate::ConfigError;
use url::Url;

/// Placeholder for the order number in per-order endpoint templates
pub const ORDER_NUMBER_PLACEHOLDER: &str = "{order_number}";

/// Placeholder for the invoice id in the invoice detail endpoint template
pub const INVOICE_ID_PLACEHOLDER: &str = "{invoice_id}";

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_rate_limit_config(&config.rate_limit)?;
    validate_fetch_settings(&config.fetch)?;
    validate_endpoint_config(&config.endpoints)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates rate limiter configuration
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.rps < 1 {
        return Err(ConfigError::Validation(format!(
            "rps must be >= 1, got {}",
            config.rps
        )));
    }

    if config.time_unit_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "time_unit_ms must be >= 1ms, got {}ms",
            config.time_unit_ms
        )));
    }

    Ok(())
}

/// Validates order and retry settings
fn validate_fetch_settings(config: &FetchSettings) -> Result<(), ConfigError> {
    if config.order_count < 1 {
        return Err(ConfigError::Validation(format!(
            "order_count must be >= 1, got {}",
            config.order_count
        )));
    }

    if config.attempts_limit < 1 || config.attempts_limit > 10 {
        return Err(ConfigError::Validation(format!(
            "attempts_limit must be between 1 and 10, got {}",
            config.attempts_limit
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates endpoint URLs and their placeholders
fn validate_endpoint_config(config: &EndpointConfig) -> Result<(), ConfigError> {
    validate_http_url("browser_url", &config.browser_url)?;
    validate_http_url("order_history", &config.order_history)?;

    for (name, template) in [
        ("invoice_overview", &config.invoice_overview),
        ("invoice_detail", &config.invoice_detail),
        ("order_aggregations", &config.order_aggregations),
    ] {
        if !template.contains(ORDER_NUMBER_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "{} must contain the {} placeholder",
                name, ORDER_NUMBER_PLACEHOLDER
            )));
        }

        // Placeholders are not valid URL characters in every position, so
        // check the template with sample values substituted.
        let sample = template
            .replace(ORDER_NUMBER_PLACEHOLDER, "0")
            .replace(INVOICE_ID_PLACEHOLDER, "0");
        validate_http_url(name, &sample)?;
    }

    if !config.invoice_detail.contains(INVOICE_ID_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "invoice_detail must contain the {} placeholder",
            INVOICE_ID_PLACEHOLDER
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a value parses as an http(s) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}
