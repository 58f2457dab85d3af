//! Harvest orchestration
//!
//! # Components
//!
//! - `harvester`: the run coordinator
//! - `order_data`: per-order invoice and aggregation fetches
//! - `endpoints`: per-order endpoint expansion

mod endpoints;
mod harvester;
mod order_data;

pub use endpoints::expand_endpoint;
pub use harvester::{HarvestReport, Harvester, OrderDataOutcome};
pub use order_data::CombinedOrder;
