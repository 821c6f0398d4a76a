//! Defines the endpoint for submitting a transaction against a rebate program.

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};

use crate::{
    AppState, Error,
    caller::Caller,
    db::Database,
    transaction::{NewTransaction, Transaction, submit_transaction},
};

/// The state needed to submit a transaction.
#[derive(Debug, Clone)]
pub struct SubmitTransactionState {
    /// The database storing programs and transactions.
    pub database: Database,
}

impl FromRef<AppState> for SubmitTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            database: state.database.clone(),
        }
    }
}

/// A route handler for submitting a transaction, responds with 201 Created and the stored transaction.
pub async fn submit_transaction_endpoint(
    State(state): State<SubmitTransactionState>,
    caller: Caller,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let transaction = state
        .database
        .run(move |connection| submit_transaction(&new_transaction, connection))
        .await
        .inspect_err(|error| tracing::warn!("{caller} could not submit transaction: {error}"))?;

    tracing::info!("{caller} submitted transaction {}", transaction.id);

    Ok((StatusCode::CREATED, Json(transaction)))
}
