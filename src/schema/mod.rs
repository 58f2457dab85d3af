//! Schema validation and typed views for upstream payloads
//!
//! # Components
//!
//! - `validate`: one shared routine per payload kind, producing `Validation`
//! - `OrderHistoryRecord`, `InvoiceOverviewItem`, `InvoiceDetail`: typed views

mod records;
mod validator;

pub use records::{invoice_overview_items, InvoiceDetail, InvoiceOverviewItem, OrderHistoryRecord};
pub use validator::{validate, PayloadKind, Validation, RESOURCE_NOT_FOUND_CODE};
