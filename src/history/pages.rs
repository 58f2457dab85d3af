//! Paginated order history fetch
//!
//! The captured request is always for page 1. Every other page is derived
//! from it by replacing `page_number` in the query, keeping the captured
//! headers, and all pages are requested concurrently. Pages are reassembled
//! by the page number the API reports, not by arrival order.

use crate::capture::FetchTemplate;
use crate::replay::Replayer;
use crate::schema::{validate, PayloadKind};
use crate::HistoryError;
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;

pub const PAGE_NUMBER_PARAM: &str = "page_number";
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// Pagination parameters read from a captured order history request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageParams {
    /// Reads and checks the pagination query parameters of a template
    ///
    /// # Errors
    ///
    /// * `HistoryError::MissingQueryParam` - a parameter is absent
    /// * `HistoryError::InvalidQueryParam` - a parameter is not an integer
    /// * `HistoryError::InvalidPageSize` - the page size is zero
    /// * `HistoryError::NotFirstPage` - the captured request is not page 1
    pub fn from_template(template: &FetchTemplate) -> Result<Self, HistoryError> {
        let page_number = read_param(template, PAGE_NUMBER_PARAM)?;
        let page_size = read_param(template, PAGE_SIZE_PARAM)?;

        if page_size == 0 {
            return Err(HistoryError::InvalidPageSize);
        }
        if page_number != 1 {
            return Err(HistoryError::NotFirstPage(page_number));
        }

        Ok(Self {
            page_number,
            page_size,
        })
    }

    /// Number of pages needed to cover `desired_count` orders
    pub fn pages_needed(&self, desired_count: usize) -> u32 {
        let page_size = self.page_size as usize;
        let pages = desired_count.div_ceil(page_size);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

fn read_param(template: &FetchTemplate, name: &'static str) -> Result<u32, HistoryError> {
    let raw = template
        .query_param(name)
        .ok_or(HistoryError::MissingQueryParam(name))?;

    raw.trim()
        .parse::<u32>()
        .map_err(|_| HistoryError::InvalidQueryParam { name, value: raw })
}

/// Fetches up to `desired_count` orders from the order history
///
/// A page that fails, or whose body is not usable JSON, contributes no
/// orders; the failure is logged and the remaining pages are still used.
/// The concatenated orders are schema checked as a whole and mismatches
/// are logged without discarding data.
pub async fn fetch_order_history(
    replayer: &Replayer,
    template: &FetchTemplate,
    desired_count: usize,
) -> Result<Vec<Value>, HistoryError> {
    let params = PageParams::from_template(template)?;

    if desired_count == 0 {
        return Ok(Vec::new());
    }

    let page_count = params.pages_needed(desired_count);
    tracing::info!(
        "Fetching {} order history page(s) of {} for {} order(s)",
        page_count,
        params.page_size,
        desired_count
    );

    let requests = (1..=page_count).map(|page| fetch_page(replayer, template, page));
    let responses = join_all(requests).await;

    let mut pages: BTreeMap<u32, Vec<Value>> = BTreeMap::new();
    for (requested, payload) in responses {
        let Some(payload) = payload else {
            continue;
        };

        let page_number = reported_page_number(&payload).unwrap_or(requested);
        let orders = match payload.get("orders").and_then(Value::as_array) {
            Some(orders) => orders.clone(),
            None => {
                tracing::warn!("Order history page {} has no orders array", page_number);
                Vec::new()
            }
        };

        if pages.insert(page_number, orders).is_some() {
            tracing::warn!(
                "Order history page {} was received more than once; keeping the latest",
                page_number
            );
        }
    }

    let received_pages = pages.len();
    let flattened = Value::Array(pages.into_values().flatten().collect());

    let validation = validate(PayloadKind::OrderHistory, &flattened);
    validation.log(PayloadKind::OrderHistory, "order history");

    let mut orders = match validation.into_data() {
        Some(Value::Array(orders)) => orders,
        _ => Vec::new(),
    };
    orders.truncate(desired_count);

    tracing::info!(
        "Fetched {} order(s) from {} of {} page(s)",
        orders.len(),
        received_pages,
        page_count
    );

    Ok(orders)
}

async fn fetch_page(replayer: &Replayer, template: &FetchTemplate, page: u32) -> (u32, Option<Value>) {
    let url = template.url_with_query_param(PAGE_NUMBER_PARAM, &page.to_string());

    match replayer.get_json(template, &url).await {
        Ok(Some(payload)) => (page, Some(payload)),
        Ok(None) => {
            tracing::warn!("Order history page {} returned no usable JSON", page);
            (page, None)
        }
        Err(e) => {
            tracing::warn!("Failed to fetch order history page {}: {}", page, e);
            (page, None)
        }
    }
}

fn reported_page_number(payload: &Value) -> Option<u32> {
    let reported = payload.get("request")?.get(PAGE_NUMBER_PARAM)?;
    match reported {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
