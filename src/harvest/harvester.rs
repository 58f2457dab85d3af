//! Harvest orchestration
//!
//! This module drives a full run:
//! - Capturing the order history request from a browser session
//! - Fetching the paged order history by replay
//! - Queueing one retryable follow-up action per order
//! - Collecting the combined results and the dropped orders

use crate::capture::{get_fetch_config, BrowserSession, FetchTemplate};
use crate::config::{Config, EndpointConfig};
use crate::harvest::order_data::{CombinedOrder, OrderFetch};
use crate::history::fetch_order_history;
use crate::limiter::RateLimiter;
use crate::queue::{ActionQueue, ActionQueueItem, DroppedAction};
use crate::replay::{build_http_client, Replayer};
use crate::schema::OrderHistoryRecord;
use crate::ReplayError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Result of the per-order phase
#[derive(Debug, Default)]
pub struct OrderDataOutcome {
    /// Combined orders sorted by their position in the order history
    pub combined: Vec<CombinedOrder>,
    pub dropped: Vec<DroppedAction>,
    /// Order history entries that had no order number
    pub skipped: usize,
    pub attempts: u32,
}

/// Everything produced by a full run
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub orders: Vec<Value>,
    pub combined: Vec<CombinedOrder>,
    pub dropped: Vec<DroppedAction>,
    pub skipped: usize,
    pub attempts: u32,
}

/// Main harvest coordinator
pub struct Harvester {
    config: Arc<Config>,
    endpoints: Arc<EndpointConfig>,
    replayer: Replayer,
}

impl Harvester {
    /// Creates a harvester with its own HTTP client and rate limiter
    ///
    /// # Errors
    ///
    /// * `HarvestError::Replay` - the HTTP client could not be built
    pub fn new(config: Config) -> crate::Result<Self> {
        let timeout = Duration::from_secs(config.fetch.request_timeout_secs);
        let client = build_http_client(timeout).map_err(ReplayError::Client)?;
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Ok(Self {
            endpoints: Arc::new(config.endpoints.clone()),
            config: Arc::new(config),
            replayer: Replayer::new(client, limiter),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn replayer(&self) -> &Replayer {
        &self.replayer
    }

    /// Captures the order history request from the browser session
    pub async fn capture_template(
        &self,
        session: &dyn BrowserSession,
    ) -> crate::Result<Arc<FetchTemplate>> {
        let captured = get_fetch_config(
            session,
            &self.endpoints.browser_url,
            &self.endpoints.order_history,
        )
        .await?;

        Ok(Arc::new(captured.template))
    }

    /// Fetches the configured number of order history entries
    pub async fn fetch_history(&self, template: &FetchTemplate) -> crate::Result<Vec<Value>> {
        let desired = self.config.fetch.order_count as usize;
        Ok(fetch_order_history(&self.replayer, template, desired).await?)
    }

    /// Runs the per-order follow-up fetches through the action queue
    pub async fn fetch_order_data(
        &self,
        template: &Arc<FetchTemplate>,
        orders: &[Value],
    ) -> crate::Result<OrderDataOutcome> {
        let attempts_limit = self.config.fetch.attempts_limit;
        let mut queue = ActionQueue::new();
        let mut skipped = 0;

        for (index, order) in orders.iter().enumerate() {
            let Some(record) = OrderHistoryRecord::from_value(order) else {
                tracing::warn!("Order history entry {} has no order number, skipping", index);
                skipped += 1;
                continue;
            };

            let fetch = Arc::new(OrderFetch {
                replayer: self.replayer.clone(),
                template: Arc::clone(template),
                endpoints: Arc::clone(&self.endpoints),
                record,
                index,
            });
            // Unique even when shifting pages repeat an order
            let id = format!("{}-{}", fetch.record.order_number, index);

            queue.push(ActionQueueItem::new(id, attempts_limit, move || {
                let fetch = Arc::clone(&fetch);
                async move { fetch.run().await }
            }));
        }

        tracing::info!("Fetching invoice data for {} order(s)", queue.len());
        let outcome = queue.start().wait().await?;

        let attempts = outcome.attempts;
        let dropped = outcome.dropped;
        let mut combined: Vec<CombinedOrder> =
            outcome.completed.into_iter().map(|c| c.output).collect();
        combined.sort_by_key(|order| order.order_index);

        if !dropped.is_empty() {
            tracing::warn!(
                "{} order(s) dropped after exhausting retries: {:?}",
                dropped.len(),
                dropped.iter().map(|d| d.id.as_str()).collect::<Vec<_>>()
            );
        }

        Ok(OrderDataOutcome {
            combined,
            dropped,
            skipped,
            attempts,
        })
    }

    /// Runs capture, history and per-order phases end to end
    pub async fn run(&self, session: &dyn BrowserSession) -> crate::Result<HarvestReport> {
        let template = self.capture_template(session).await?;
        let orders = self.fetch_history(&template).await?;
        let outcome = self.fetch_order_data(&template, &orders).await?;

        tracing::info!(
            "Harvest complete: {} order(s), {} combined, {} dropped",
            orders.len(),
            outcome.combined.len(),
            outcome.dropped.len()
        );

        Ok(HarvestReport {
            orders,
            combined: outcome.combined,
            dropped: outcome.dropped,
            skipped: outcome.skipped,
            attempts: outcome.attempts,
        })
    }
}
