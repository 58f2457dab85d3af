//! Order history retrieval

mod pages;

pub use pages::{fetch_order_history, PageParams, PAGE_NUMBER_PARAM, PAGE_SIZE_PARAM};
