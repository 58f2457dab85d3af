//! Run summary
//!
//! Collects the counts of a finished harvest and prints them to stdout.

use crate::harvest::HarvestReport;
use std::path::PathBuf;

/// Summary of one harvest run
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    /// Orders requested from the order history
    pub orders_requested: u32,

    /// Orders returned by the order history
    pub orders_fetched: usize,

    /// Orders combined with their invoice data
    pub orders_combined: usize,

    /// Order history entries without an order number
    pub orders_skipped: usize,

    /// Orders whose follow-up fetches exhausted every attempt
    pub dropped_orders: Vec<String>,

    /// Follow-up action attempts, including retries
    pub attempts: u32,

    pub files_written: Vec<PathBuf>,
}

impl HarvestSummary {
    pub fn from_report(report: &HarvestReport, orders_requested: u32) -> Self {
        Self {
            orders_requested,
            orders_fetched: report.orders.len(),
            orders_combined: report.combined.len(),
            orders_skipped: report.skipped,
            dropped_orders: report.dropped.iter().map(|d| d.id.clone()).collect(),
            attempts: report.attempts,
            files_written: Vec::new(),
        }
    }

    /// Follow-up attempts beyond the first one per order
    pub fn retries(&self) -> u32 {
        let first_attempts = self.orders_combined + self.dropped_orders.len();
        self.attempts
            .saturating_sub(u32::try_from(first_attempts).unwrap_or(u32::MAX))
    }

    /// Share of fetched orders that were combined, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.orders_fetched == 0 {
            0.0
        } else {
            (self.orders_combined as f64 / self.orders_fetched as f64) * 100.0
        }
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &HarvestSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Orders:");
    println!("  Requested: {}", summary.orders_requested);
    println!("  Fetched: {}", summary.orders_fetched);
    println!(
        "  Combined with invoice data: {} ({:.1}%)",
        summary.orders_combined,
        summary.success_rate()
    );
    if summary.orders_skipped > 0 {
        println!("  Skipped (no order number): {}", summary.orders_skipped);
    }
    println!();

    println!("Follow-up actions:");
    println!("  Attempts: {}", summary.attempts);
    println!("  Retries: {}", summary.retries());
    println!();

    if !summary.dropped_orders.is_empty() {
        println!("Dropped Orders ({}):", summary.dropped_orders.len());
        for order in &summary.dropped_orders {
            println!("  - {}", order);
        }
        println!();
    }

    if !summary.files_written.is_empty() {
        println!("Files:");
        for path in &summary.files_written {
            println!("  {}", path.display());
        }
    }
}
