//! Per-order endpoint URL expansion

use crate::config::{INVOICE_ID_PLACEHOLDER, ORDER_NUMBER_PLACEHOLDER};
use crate::ConfigError;
use url::form_urlencoded::byte_serialize;
use url::Url;

/// Expands an endpoint template for one order and, optionally, one invoice
///
/// Placeholder values are percent-encoded before substitution.
pub fn expand_endpoint(
    template: &str,
    order_number: &str,
    invoice_id: Option<&str>,
) -> Result<Url, ConfigError> {
    let mut expanded = template.replace(ORDER_NUMBER_PLACEHOLDER, &encode(order_number));
    if let Some(invoice_id) = invoice_id {
        expanded = expanded.replace(INVOICE_ID_PLACEHOLDER, &encode(invoice_id));
    }

    Url::parse(&expanded).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", expanded, e)))
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}
