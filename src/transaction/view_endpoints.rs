//! Endpoints for looking up and deleting a single transaction.

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};

use crate::{
    AppState, Error,
    caller::Caller,
    database_id::TransactionId,
    db::Database,
    transaction::{Transaction, delete_transaction, get_transaction},
};

/// The state needed to read or delete a transaction.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database storing transactions.
    pub database: Database,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            database: state.database.clone(),
        }
    }
}

/// A route handler for getting a live transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let transaction = state
        .database
        .run(move |connection| get_transaction(transaction_id, connection))
        .await?;

    Ok(Json(transaction))
}

/// A route handler for soft deleting a transaction, responds with 204 No Content.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    caller: Caller,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    state
        .database
        .run(move |connection| delete_transaction(transaction_id, connection))
        .await?;

    tracing::info!("{caller} deleted transaction {transaction_id}");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };

    use crate::{caller::Caller, test_utils::get_test_state};

    use super::{TransactionState, delete_transaction_endpoint, get_transaction_endpoint};

    #[tokio::test]
    async fn get_missing_transaction_is_not_found() {
        let (_dir, state) = get_test_state();
        let state = TransactionState {
            database: state.database,
        };

        let response = get_transaction_endpoint(State(state), Path(3))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_missing_transaction_is_not_found() {
        let (_dir, state) = get_test_state();
        let state = TransactionState {
            database: state.database,
        };

        let response = delete_transaction_endpoint(State(state), Caller::anonymous(), Path(3))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
