//! Rebate claims and the settlement engine that creates them.
//!
//! This module contains everything related to claims:
//! - The `RebateClaim` model and the claim store queries
//! - The rebate calculation
//! - The per-transaction advisory locks and the settlement engine
//! - Route handlers for filing, quoting, reading, and deleting claims

mod calculation;
mod claim_endpoint;
mod core;
mod lock;
mod settlement;
mod view_endpoints;

pub use calculation::{CURRENCY_DECIMAL_PLACES, calculate_rebate_amount};
pub use claim_endpoint::{calculate_rebate_endpoint, claim_rebate_endpoint};
pub use core::{
    ClaimStatus, RebateClaim, count_claims_by_status, create_claim_table, delete_claim,
    get_claim, get_claim_for_transaction, get_recent_claims,
};
pub use lock::{AdvisoryLockGuard, AdvisoryLocks};
pub use settlement::{SettlementScope, calculate_rebate, claim_rebate};
pub use view_endpoints::{delete_claim_endpoint, get_claim_endpoint};

pub(crate) use core::insert_claim;
