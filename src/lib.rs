//! Rebate Claims is a service for settling rebate claims on purchases.
//!
//! Partners register time-bounded rebate programs, submit transactions
//! against them, and claim the rebate owed on each transaction. Every
//! transaction can be claimed at most once, no matter how many requests race
//! to claim it.
//!
//! This library provides a JSON REST API backed by SQLite.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use rust_decimal::Decimal;
use serde_json::json;
use tokio::signal;

mod app_state;
mod caller;
mod claim;
mod config;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod program;
mod report;
mod routing;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use caller::{CALLER_HEADER, Caller};
pub use claim::{
    AdvisoryLockGuard, AdvisoryLocks, ClaimStatus, RebateClaim, SettlementScope,
    calculate_rebate, calculate_rebate_amount, claim_rebate, get_claim,
};
pub use config::RebateConfig;
pub use database_id::{ClaimId, DatabaseId, ProgramId, TransactionId};
pub use db::{DEFAULT_BUSY_TIMEOUT, Database, initialize as initialize_db};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use program::{NewRebateProgram, RebateProgram, create_rebate_program, get_rebate_program};
pub use report::{ClaimSummary, StatusCount, get_claim_summary};
pub use routing::build_router;
pub use transaction::{NewTransaction, Transaction, get_transaction, submit_transaction};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A rebate percentage was negative, above the configured maximum, or finer than a hundredth.
    #[error("{0} is not a valid rebate percentage")]
    InvalidPercentage(Decimal),

    /// A program's start date was after its end date.
    #[error("the program start date must not be after its end date")]
    InvalidDateRange,

    /// A program was registered with a blank name.
    #[error("the program name cannot be empty")]
    InvalidProgramName,

    /// A transaction amount was not positive, was too large, or had fractions of a cent.
    #[error(
        "the transaction amount must be greater than zero, at most 999,999,999.99, and in whole cents"
    )]
    InvalidAmount,

    /// The rebate program does not exist or was deleted.
    #[error("the rebate program could not be found")]
    ProgramNotFound,

    /// The transaction does not exist or was deleted.
    #[error("the transaction could not be found")]
    TransactionNotFound,

    /// The rebate claim does not exist or was deleted.
    #[error("the rebate claim could not be found")]
    ClaimNotFound,

    /// A transaction was dated outside its program's eligibility window.
    #[error("the transaction date is outside the rebate program's window")]
    OutOfWindow,

    /// The transaction already has a claim.
    ///
    /// Deleted claims still count, so a transaction can only ever be claimed once.
    #[error("the transaction has already been claimed")]
    DuplicateClaim,

    /// A report was requested for a range whose start is after its end.
    #[error("the start date must not be after the end date")]
    InvalidRange,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// A blocking database task panicked or was cancelled.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("a database task failed: {0}")]
    TaskFailed(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067
                    && desc.ends_with("rebate_claim.transaction_id") =>
            {
                Error::DuplicateClaim
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidPercentage(_)
            | Error::InvalidDateRange
            | Error::InvalidProgramName
            | Error::InvalidAmount
            | Error::OutOfWindow
            | Error::InvalidRange => StatusCode::BAD_REQUEST,
            Error::ProgramNotFound | Error::TransactionNotFound | Error::ClaimNotFound => {
                StatusCode::NOT_FOUND
            }
            Error::DuplicateClaim => StatusCode::CONFLICT,
            Error::SqlError(_) | Error::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        let message = match &self {
            // Internal errors are not intended to be shown to the client.
            Error::SqlError(_) | Error::TaskFailed(_) => {
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            error => error.to_string(),
        };

        (status_code, Json(json!({ "message": message }))).into_response()
    }
}
