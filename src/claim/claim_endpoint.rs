//! Defines the endpoints that run the settlement engine: filing a claim and
//! quoting the rebate on a transaction.

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    caller::Caller,
    claim::{AdvisoryLocks, RebateClaim, calculate_rebate, claim_rebate},
    database_id::TransactionId,
    db::Database,
};

/// The state needed to settle claims.
#[derive(Debug, Clone)]
pub struct SettlementState {
    /// The database storing transactions and claims.
    pub database: Database,
    /// The per-transaction locks shared by every settlement.
    pub settlement_locks: AdvisoryLocks,
}

impl FromRef<AppState> for SettlementState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            database: state.database.clone(),
            settlement_locks: state.settlement_locks.clone(),
        }
    }
}

/// The request body for filing a claim.
///
/// Any amount sent by the client is ignored. The claim amount is always derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClaim {
    /// The transaction to claim the rebate on.
    pub transaction_id: TransactionId,
    /// The date the claim is filed.
    pub claim_date: Date,
}

/// The rebate a transaction would receive if it were claimed now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateQuote {
    /// The rebate amount.
    pub rebate: Decimal,
}

/// A route handler for filing a rebate claim, responds with 201 Created and the stored claim.
pub async fn claim_rebate_endpoint(
    State(state): State<SettlementState>,
    caller: Caller,
    Json(new_claim): Json<NewClaim>,
) -> Result<(StatusCode, Json<RebateClaim>), Error> {
    let NewClaim {
        transaction_id,
        claim_date,
    } = new_claim;
    let locks = state.settlement_locks;

    let claim = state
        .database
        .run(move |connection| claim_rebate(transaction_id, claim_date, connection, &locks))
        .await
        .inspect_err(|error| {
            tracing::warn!("{caller} could not claim rebate for transaction {transaction_id}: {error}")
        })?;

    tracing::info!(
        "{caller} claimed rebate {} on transaction {transaction_id}",
        claim.id
    );

    Ok((StatusCode::CREATED, Json(claim)))
}

/// A route handler for quoting the rebate on a transaction without claiming it.
pub async fn calculate_rebate_endpoint(
    State(state): State<SettlementState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<RebateQuote>, Error> {
    let locks = state.settlement_locks;

    let rebate = state
        .database
        .run(move |connection| calculate_rebate(transaction_id, connection, &locks))
        .await?;

    Ok(Json(RebateQuote { rebate }))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::StatusCode,
        routing::{get, post},
    };
    use axum_test::TestServer;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use time::macros::date;

    use crate::{
        caller::CALLER_HEADER,
        claim::{ClaimStatus, RebateClaim},
        endpoints::{self, format_endpoint},
        program::{create_rebate_program, test_utils::new_program},
        test_utils::get_test_state,
        transaction::{NewTransaction, Transaction, submit_transaction},
    };

    use super::{NewClaim, RebateQuote, calculate_rebate_endpoint, claim_rebate_endpoint};

    fn get_test_server() -> (tempfile::TempDir, TestServer, Transaction) {
        let (dir, state) = get_test_state();
        let connection = state.database.connect().unwrap();
        let program = create_rebate_program(
            &new_program(dec!(15.00), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            dec!(100),
            &connection,
        )
        .unwrap();
        let transaction = submit_transaction(
            &NewTransaction {
                amount: dec!(200.00),
                transaction_date: date!(2024 - 04 - 01),
                rebate_program_id: program.id,
            },
            &connection,
        )
        .unwrap();
        let app = Router::new()
            .route(endpoints::REBATE_CLAIMS, post(claim_rebate_endpoint))
            .route(endpoints::TRANSACTION_REBATE, get(calculate_rebate_endpoint))
            .with_state(state);

        (
            dir,
            TestServer::new(app),
            transaction,
        )
    }

    #[tokio::test]
    async fn claim_succeeds_with_derived_amount() {
        let (_dir, server, transaction) = get_test_server();

        let response = server
            .post(endpoints::REBATE_CLAIMS)
            .add_header(CALLER_HEADER, "partner-1")
            .json(&NewClaim {
                transaction_id: transaction.id,
                claim_date: date!(2024 - 04 - 02),
            })
            .await;

        response.assert_status(StatusCode::CREATED);
        let claim = response.json::<RebateClaim>();
        assert_eq!(claim.transaction_id, transaction.id);
        assert_eq!(claim.claim_amount, dec!(30.00));
        assert_eq!(claim.status, ClaimStatus::Pending);
    }

    #[tokio::test]
    async fn client_supplied_amount_is_ignored() {
        let (_dir, server, transaction) = get_test_server();

        let response = server
            .post(endpoints::REBATE_CLAIMS)
            .json(&json!({
                "transaction_id": transaction.id,
                "claim_date": "2024-04-02",
                "claim_amount": "99999.00",
                "status": "approved",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let claim = response.json::<RebateClaim>();
        assert_eq!(claim.claim_amount, dec!(30.00));
        assert_eq!(claim.status, ClaimStatus::Pending);
    }

    #[tokio::test]
    async fn second_claim_is_conflict() {
        let (_dir, server, transaction) = get_test_server();
        let new_claim = NewClaim {
            transaction_id: transaction.id,
            claim_date: date!(2024 - 04 - 02),
        };
        server
            .post(endpoints::REBATE_CLAIMS)
            .json(&new_claim)
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.post(endpoints::REBATE_CLAIMS).json(&new_claim).await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn claim_on_missing_transaction_is_not_found() {
        let (_dir, server, _) = get_test_server();

        let response = server
            .post(endpoints::REBATE_CLAIMS)
            .json(&NewClaim {
                transaction_id: 404,
                claim_date: date!(2024 - 04 - 02),
            })
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn calculate_returns_rebate_without_claiming() {
        let (_dir, server, transaction) = get_test_server();
        let uri = format_endpoint(endpoints::TRANSACTION_REBATE, transaction.id);

        let first = server.get(&uri).await;
        let second = server.get(&uri).await;

        first.assert_status_ok();
        assert_eq!(first.json::<RebateQuote>().rebate, dec!(30.00));
        assert_eq!(second.json::<RebateQuote>().rebate, dec!(30.00));

        // The transaction can still be claimed afterwards.
        server
            .post(endpoints::REBATE_CLAIMS)
            .json(&NewClaim {
                transaction_id: transaction.id,
                claim_date: date!(2024 - 04 - 02),
            })
            .await
            .assert_status(StatusCode::CREATED);
    }
}
