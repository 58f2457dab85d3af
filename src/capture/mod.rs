//! Capture of replayable request templates
//!
//! This module contains:
//! - The `BrowserSession` seam to an external, already-authenticated browser
//! - A response tap that correlates observed responses with registered matchers
//! - Template extraction from an observed request
//! - A recorded session for running from a devtools capture file

mod extractor;
mod recorded;
mod tap;
mod template;

pub use extractor::{get_fetch_config, BrowserSession, CapturedFetchConfig, EndpointMatcher};
pub use recorded::RecordedSession;
pub use tap::{PendingResponse, ResponseTap};
pub use template::{extract_fetch_template, FetchTemplate, ObservedRequest, ObservedResponse};
