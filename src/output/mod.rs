//! Output of harvest results
//!
//! This module handles:
//! - Writing the timestamped JSON documents of a run
//! - Summarizing and printing run statistics

mod json_file;
mod summary;

pub use json_file::JsonFileSink;
pub use summary::{print_summary, HarvestSummary};

/// Data type name of the order history document
pub const ORDER_HISTORY_DATA: &str = "orderHistoryData";

/// Data type name of the combined invoice and order document
pub const COMBINED_ORDER_DATA: &str = "invoiceAndOrderData";
