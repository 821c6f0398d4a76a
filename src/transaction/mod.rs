//! Transactions submitted against rebate programs.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the eligibility check run on submission
//! - Database functions for storing, querying, and soft deleting transactions
//! - Route handlers for the transaction API

mod core;
mod submit_endpoint;
mod view_endpoints;

pub use core::{
    NewTransaction, Transaction, create_transaction_table, delete_transaction,
    get_recent_transactions, get_transaction, submit_transaction,
};
pub use submit_endpoint::submit_transaction_endpoint;
pub use view_endpoints::{delete_transaction_endpoint, get_transaction_endpoint};
