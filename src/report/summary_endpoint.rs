//! The endpoint for the claim summary report.

use axum::{
    Json,
    extract::{FromRef, Query, State},
};
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    db::Database,
    report::{ClaimSummary, get_claim_summary},
};

/// The state needed to build the claim summary.
#[derive(Debug, Clone)]
pub struct ReportState {
    /// The database storing programs, transactions and claims.
    pub database: Database,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            database: state.database.clone(),
        }
    }
}

/// The date range to summarise, inclusive of both ends.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    /// The first claim date to count.
    pub start_date: Date,
    /// The last claim date to count.
    pub end_date: Date,
}

/// A route handler for getting the claim summary for a date range.
pub async fn get_claim_summary_endpoint(
    State(state): State<ReportState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ClaimSummary>, Error> {
    let SummaryQuery {
        start_date,
        end_date,
    } = query;

    let summary = state
        .database
        .run(move |connection| get_claim_summary(start_date, end_date, connection))
        .await?;

    Ok(Json(summary))
}
