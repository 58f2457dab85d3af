//! Direct HTTP replay of captured browser requests

mod client;

pub use client::{build_http_client, parse_json_no_throw, template_headers, Replayer};
