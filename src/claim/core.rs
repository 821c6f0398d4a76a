//! Defines the rebate claim model and the database queries for claims.
//!
//! Claims are only ever written by [crate::claim::claim_rebate], which holds
//! the per-transaction lock while it inserts.

use std::fmt::Display;

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::{ClaimId, TransactionId},
    db::get_decimal,
};

// ============================================================================
// MODELS
// ============================================================================

/// Where a claim is in its review.
///
/// Claims are always created as [ClaimStatus::Pending]. Approval and
/// rejection happen outside this service.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    /// Waiting for review.
    #[default]
    Pending,
    /// The rebate will be paid.
    Approved,
    /// The rebate will not be paid.
    Rejected,
}

impl ClaimStatus {
    /// The name used for the status in the database and the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
        }
    }
}

impl Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for ClaimStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for ClaimStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(ClaimStatus::Pending),
            "approved" => Ok(ClaimStatus::Approved),
            "rejected" => Ok(ClaimStatus::Rejected),
            other => Err(FromSqlError::Other(
                format!("unknown claim status \"{other}\"").into(),
            )),
        }
    }
}

/// A request to redeem the rebate on one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateClaim {
    /// The ID of the claim.
    pub id: ClaimId,
    /// The transaction being claimed. A transaction has at most one claim.
    pub transaction_id: TransactionId,
    /// The rebate owed, derived from the transaction and its program.
    pub claim_amount: Decimal,
    /// Where the claim is in its review.
    pub status: ClaimStatus,
    /// The date the claim was filed.
    pub claim_date: Date,
    /// When the claim was stored.
    pub created_at: OffsetDateTime,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Store a new pending claim.
///
/// Callers must hold the settlement lock for `transaction_id`. The UNIQUE
/// constraint on `transaction_id` rejects a second claim if they do not.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateClaim] if the transaction already has a claim, including a deleted one,
/// - [Error::TransactionNotFound] if `transaction_id` does not refer to a transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn insert_claim(
    transaction_id: TransactionId,
    claim_amount: Decimal,
    claim_date: Date,
    connection: &Connection,
) -> Result<RebateClaim, Error> {
    connection
        .prepare(
            "INSERT INTO rebate_claim (transaction_id, claim_amount, status, claim_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, transaction_id, claim_amount, status, claim_date, created_at",
        )?
        .query_row(
            (
                transaction_id,
                claim_amount.to_string(),
                ClaimStatus::Pending,
                claim_date,
                OffsetDateTime::now_utc(),
            ),
            map_claim_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::TransactionNotFound,
            error => error.into(),
        })
}

/// Retrieve a live claim by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::ClaimNotFound] if `id` does not refer to a claim or it was deleted,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_claim(id: ClaimId, connection: &Connection) -> Result<RebateClaim, Error> {
    connection
        .prepare(
            "SELECT id, transaction_id, claim_amount, status, claim_date, created_at
             FROM rebate_claim
             WHERE id = :id AND deleted_at IS NULL",
        )?
        .query_row(&[(":id", &id)], map_claim_row)
        .optional()?
        .ok_or(Error::ClaimNotFound)
}

/// Retrieve the live claim for a transaction, if there is one.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_claim_for_transaction(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Option<RebateClaim>, Error> {
    connection
        .prepare(
            "SELECT id, transaction_id, claim_amount, status, claim_date, created_at
             FROM rebate_claim
             WHERE transaction_id = :transaction_id AND deleted_at IS NULL",
        )?
        .query_row(&[(":transaction_id", &transaction_id)], map_claim_row)
        .optional()
        .map_err(Error::from)
}

/// Mark a claim as deleted.
///
/// The row is kept, so the transaction still cannot be claimed again.
///
/// # Errors
/// This function will return a:
/// - [Error::ClaimNotFound] if `id` does not refer to a live claim,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_claim(id: ClaimId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE rebate_claim SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        (OffsetDateTime::now_utc(), id),
    )?;

    if rows_affected == 0 {
        return Err(Error::ClaimNotFound);
    }

    tracing::info!("Deleted rebate claim {id}");

    Ok(())
}

/// Get the `limit` most recently created live claims, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_recent_claims(limit: u32, connection: &Connection) -> Result<Vec<RebateClaim>, Error> {
    connection
        .prepare(
            "SELECT id, transaction_id, claim_amount, status, claim_date, created_at
             FROM rebate_claim
             WHERE deleted_at IS NULL
             ORDER BY created_at DESC, id DESC
             LIMIT :limit",
        )?
        .query_map(&[(":limit", &limit)], map_claim_row)?
        .map(|maybe_claim| maybe_claim.map_err(Error::from))
        .collect()
}

/// Count the live claims filed between `start_date` and `end_date` inclusive, per status.
///
/// Statuses with no claims are left out. The result is ordered by status.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn count_claims_by_status(
    start_date: Date,
    end_date: Date,
    connection: &Connection,
) -> Result<Vec<(ClaimStatus, u64)>, Error> {
    let mut counts = connection
        .prepare(
            "SELECT status, COUNT(id)
             FROM rebate_claim
             WHERE claim_date BETWEEN :start AND :end AND deleted_at IS NULL
             GROUP BY status",
        )?
        .query_map(&[(":start", &start_date), (":end", &end_date)], |row| {
            let count: i64 = row.get(1)?;
            let count = u64::try_from(count)
                .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(1, count))?;
            Ok((row.get(0)?, count))
        })?
        .collect::<Result<Vec<(ClaimStatus, u64)>, rusqlite::Error>>()?;

    counts.sort_by_key(|(status, _)| *status);

    Ok(counts)
}

/// Create the rebate claim table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_claim_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS rebate_claim (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_id INTEGER NOT NULL UNIQUE,
                claim_amount TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'approved', 'rejected')),
                claim_date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                deleted_at TEXT,
                FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Used by the claim summary report.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_rebate_claim_date_status ON rebate_claim(claim_date, status);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [RebateClaim].
pub fn map_claim_row(row: &Row) -> Result<RebateClaim, rusqlite::Error> {
    let id = row.get(0)?;
    let transaction_id = row.get(1)?;
    let claim_amount = get_decimal(row, 2)?;
    let status = row.get(3)?;
    let claim_date = row.get(4)?;
    let created_at = row.get(5)?;

    Ok(RebateClaim {
        id,
        transaction_id,
        claim_amount,
        status,
        claim_date,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
