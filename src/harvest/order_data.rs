//! Per-order follow-up fetches
//!
//! For one order this fetches the invoice overview, the detail of every
//! invoice it lists, and the order aggregations, then combines them with
//! the order history entry.

use crate::capture::FetchTemplate;
use crate::config::EndpointConfig;
use crate::harvest::endpoints::expand_endpoint;
use crate::replay::Replayer;
use crate::schema::{
    invoice_overview_items, validate, InvoiceDetail, OrderHistoryRecord, PayloadKind, Validation,
};
use crate::HarvestError;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// An order history entry combined with its invoice data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedOrder {
    #[serde(rename = "__orderIndex")]
    pub order_index: usize,

    /// Placed date as epoch milliseconds
    #[serde(rename = "_orderDate")]
    pub order_date: Option<i64>,

    #[serde(rename = "_orderNumber")]
    pub order_number: String,

    /// Invoice details, in overview order
    #[serde(rename = "invoicesData")]
    pub invoices: Vec<Value>,

    #[serde(rename = "aggregationsData", skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,

    #[serde(rename = "orderHistoryData")]
    pub order: Value,
}

/// Everything one order's action needs, shared across its retries
pub(crate) struct OrderFetch {
    pub replayer: Replayer,
    pub template: Arc<FetchTemplate>,
    pub endpoints: Arc<EndpointConfig>,
    pub record: OrderHistoryRecord,
    pub index: usize,
}

impl OrderFetch {
    pub async fn run(&self) -> crate::Result<CombinedOrder> {
        let order_number = self.record.order_number.as_str();
        tracing::info!("Getting invoice data for order {}", order_number);

        let invoices = self.fetch_invoices().await?;

        let aggregations = if self.endpoints.fetch_aggregations {
            let url = expand_endpoint(&self.endpoints.order_aggregations, order_number, None)?;
            self.fetch_payload(PayloadKind::OrderAggregations, &url).await?
        } else {
            None
        };

        Ok(CombinedOrder {
            order_index: self.index,
            order_date: self.record.placed_timestamp_millis(),
            order_number: self.record.order_number.clone(),
            invoices,
            aggregations,
            order: self.record.raw.clone(),
        })
    }

    async fn fetch_invoices(&self) -> crate::Result<Vec<Value>> {
        let order_number = self.record.order_number.as_str();
        let url = expand_endpoint(&self.endpoints.invoice_overview, order_number, None)?;

        let Some(overview) = self.fetch_payload(PayloadKind::InvoiceOverview, &url).await? else {
            return Ok(Vec::new());
        };

        let summaries = overview_invoices(&url, &overview)?;
        if !self.endpoints.fetch_invoice_details {
            return Ok(summaries.clone());
        }

        let items = invoice_overview_items(&overview);

        // One invoice at a time
        let mut details = Vec::with_capacity(items.len());
        for item in &items {
            tracing::debug!(
                "Getting invoice {} for order {}",
                item.id,
                order_number
            );
            let url = expand_endpoint(&self.endpoints.invoice_detail, order_number, Some(&item.id))?;
            if let Some(detail) = self.fetch_payload(PayloadKind::InvoiceDetail, &url).await? {
                check_detail(&item.id, &detail);
                details.push(detail);
            }
        }

        Ok(details)
    }

    /// Fetches and validates one payload
    ///
    /// Returns `None` when the API reports the resource does not exist.
    /// A body that is not usable JSON is an error so the action is retried.
    async fn fetch_payload(&self, kind: PayloadKind, url: &Url) -> crate::Result<Option<Value>> {
        let payload = self
            .replayer
            .get_json(&self.template, url)
            .await?
            .ok_or_else(|| HarvestError::Payload {
                url: url.to_string(),
                message: format!("{} response has no usable JSON body", kind.name()),
            })?;

        let subject = format!("order {}", self.record.order_number);
        let validation = validate(kind, &payload);
        validation.log(kind, &subject);

        Ok(match validation {
            Validation::Empty { .. } => None,
            Validation::Valid(_) | Validation::Mismatch { .. } => Some(payload),
        })
    }
}

/// Returns the invoice list of an overview payload
///
/// An overview without an `invoices` array is an application error (code
/// 102 never reaches here), so the order's action is failed and retried.
fn overview_invoices<'a>(url: &Url, overview: &'a Value) -> crate::Result<&'a Vec<Value>> {
    overview
        .get("invoices")
        .and_then(Value::as_array)
        .ok_or_else(|| HarvestError::Payload {
            url: url.to_string(),
            message: match overview.get("code") {
                Some(code) => format!("invoice overview has no invoices (code {})", code),
                None => "invoice overview has no invoices array".to_string(),
            },
        })
}

/// Checks a fetched detail against the overview entry it was requested for
///
/// Returns false, with a warning, when the detail cannot be read or names a
/// different invoice. The detail is kept either way.
fn check_detail(expected_id: &str, detail: &Value) -> bool {
    match InvoiceDetail::from_value(detail) {
        Some(parsed) if parsed.id == expected_id => {
            tracing::debug!(
                "Invoice {}: {} line(s), total {:?}",
                parsed.id,
                parsed.lines.len(),
                parsed.total_amount
            );
            true
        }
        Some(parsed) => {
            tracing::warn!(
                "Requested invoice {} but the detail is for invoice {}",
                expected_id,
                parsed.id
            );
            false
        }
        None => {
            tracing::warn!("Detail for invoice {} has no readable id", expected_id);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overview_url() -> Url {
        Url::parse("https://api.example.com/v1/orders/912/invoices").unwrap()
    }

    #[test]
    fn test_overview_invoices() {
        let overview = json!({"invoices": [{"id": "1"}, {"id": "2"}]});
        let invoices = overview_invoices(&overview_url(), &overview).unwrap();
        assert_eq!(invoices.len(), 2);

        let empty = json!({"invoices": []});
        assert!(overview_invoices(&overview_url(), &empty).unwrap().is_empty());
    }

    #[test]
    fn test_overview_error_code_is_an_error() {
        let overview = json!({"code": 500, "message": "Internal error"});
        let result = overview_invoices(&overview_url(), &overview);

        match result {
            Err(HarvestError::Payload { url, message }) => {
                assert!(url.ends_with("/v1/orders/912/invoices"));
                assert!(message.contains("code 500"));
            }
            other => panic!("expected a payload error, got {:?}", other),
        }
    }

    #[test]
    fn test_overview_invoices_not_an_array() {
        let overview = json!({"invoices": {"id": "1"}});
        assert!(overview_invoices(&overview_url(), &overview).is_err());
    }

    #[test]
    fn test_check_detail() {
        let detail = json!({
            "id": "inv-1",
            "date": "2024-08-18",
            "type": "SHIPMENT",
            "total_amount": 13.19,
            "lines": [{"quantity": 1}],
            "payments": []
        });
        assert!(check_detail("inv-1", &detail));
        assert!(!check_detail("inv-2", &detail));
        assert!(!check_detail("inv-1", &json!({"lines": []})));
    }
}
