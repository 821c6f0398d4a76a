//! Endpoints for looking up and deleting a single rebate claim.

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};

use crate::{
    AppState, Error,
    caller::Caller,
    claim::{RebateClaim, delete_claim, get_claim},
    database_id::ClaimId,
    db::Database,
};

/// The state needed to read or delete a claim.
#[derive(Debug, Clone)]
pub struct ClaimState {
    /// The database storing claims.
    pub database: Database,
}

impl FromRef<AppState> for ClaimState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            database: state.database.clone(),
        }
    }
}

/// A route handler for getting a live rebate claim.
pub async fn get_claim_endpoint(
    State(state): State<ClaimState>,
    Path(claim_id): Path<ClaimId>,
) -> Result<Json<RebateClaim>, Error> {
    let claim = state
        .database
        .run(move |connection| get_claim(claim_id, connection))
        .await?;

    Ok(Json(claim))
}

/// A route handler for soft deleting a rebate claim, responds with 204 No Content.
///
/// The transaction cannot be claimed again afterwards.
pub async fn delete_claim_endpoint(
    State(state): State<ClaimState>,
    caller: Caller,
    Path(claim_id): Path<ClaimId>,
) -> Result<StatusCode, Error> {
    state
        .database
        .run(move |connection| delete_claim(claim_id, connection))
        .await?;

    tracing::info!("{caller} deleted rebate claim {claim_id}");

    Ok(StatusCode::NO_CONTENT)
}
