//! The claim summary report: claim counts per status over a date range and
//! the latest activity across the service.

mod core;
mod summary_endpoint;

pub use core::{ClaimSummary, StatusCount, get_claim_summary};
pub use summary_endpoint::get_claim_summary_endpoint;
