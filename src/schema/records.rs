//! Best-effort typed views over validated payloads
//!
//! The raw JSON stays the source of truth. These views only pull out the
//! fields the pipeline needs to drive follow-up requests.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the order history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderHistoryRecord {
    pub order_number: String,
    pub placed_date: Option<String>,
    pub grand_total: Option<String>,
    pub order_lines: Vec<Value>,
    /// The full order as returned by the API
    pub raw: Value,
}

#[derive(Deserialize)]
struct RawOrder {
    order_number: String,
    #[serde(default)]
    placed_date: Option<String>,
    #[serde(default)]
    summary: Option<RawSummary>,
    #[serde(default)]
    order_lines: Vec<Value>,
}

#[derive(Deserialize)]
struct RawSummary {
    #[serde(default)]
    grand_total: Option<String>,
}

impl OrderHistoryRecord {
    /// Parses an order, returning `None` when it has no usable order number
    pub fn from_value(value: &Value) -> Option<Self> {
        let raw: RawOrder = serde_json::from_value(value.clone()).ok()?;
        Some(Self {
            order_number: raw.order_number,
            placed_date: raw.placed_date,
            grand_total: raw.summary.and_then(|s| s.grand_total),
            order_lines: raw.order_lines,
            raw: value.clone(),
        })
    }

    /// Placed date as milliseconds since the Unix epoch
    ///
    /// `None` when the date is missing, empty or not RFC 3339.
    pub fn placed_timestamp_millis(&self) -> Option<i64> {
        let date = self.placed_date.as_deref().filter(|d| !d.is_empty())?;
        DateTime::parse_from_rfc3339(date)
            .ok()
            .map(|parsed| parsed.timestamp_millis())
    }
}

/// One invoice in an order's invoice overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceOverviewItem {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Extracts the invoice list from an overview payload
///
/// Entries without a string `id` are skipped with a warning since no detail
/// can be requested for them.
pub fn invoice_overview_items(payload: &Value) -> Vec<InvoiceOverviewItem> {
    let Some(invoices) = payload.get("invoices").and_then(Value::as_array) else {
        return Vec::new();
    };

    invoices
        .iter()
        .filter_map(|invoice| match serde_json::from_value(invoice.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping invoice without a usable id ({}): {}", e, invoice);
                None
            }
        })
        .collect()
}

/// Detail of a single invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub lines: Vec<Value>,
}

impl InvoiceDetail {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
