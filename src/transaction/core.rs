//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    claim::CURRENCY_DECIMAL_PLACES,
    database_id::{ProgramId, TransactionId},
    db::get_decimal,
    program::get_rebate_program,
};

// ============================================================================
// MODELS
// ============================================================================

/// A purchase that is eligible for a rebate under exactly one program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// How much was spent, always greater than zero.
    pub amount: Decimal,
    /// When the purchase happened.
    pub transaction_date: Date,
    /// The program the transaction was submitted against.
    pub rebate_program_id: ProgramId,
    /// When the transaction was submitted.
    pub created_at: OffsetDateTime,
}

/// The data needed to submit a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// How much was spent.
    pub amount: Decimal,
    /// When the purchase happened.
    pub transaction_date: Date,
    /// The program to submit the transaction against.
    pub rebate_program_id: ProgramId,
}

/// The largest transaction amount accepted, in cents.
const MAX_AMOUNT_CENTS: i64 = 99_999_999_999;

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Submit a transaction against a live rebate program.
///
/// The program lookup and the window check are not locked. A program that is
/// edited or deleted at the same moment may still accept the transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is zero, negative, above 999,999,999.99,
///   or has fractions of a cent,
/// - [Error::ProgramNotFound] if the program does not exist or was deleted,
/// - [Error::OutOfWindow] if the transaction date falls outside the program's window,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn submit_transaction(
    new_transaction: &NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if new_transaction.amount <= Decimal::ZERO
        || new_transaction.amount > Decimal::new(MAX_AMOUNT_CENTS, 2)
        || new_transaction.amount.normalize().scale() > CURRENCY_DECIMAL_PLACES
    {
        return Err(Error::InvalidAmount);
    }

    let program = get_rebate_program(new_transaction.rebate_program_id, connection)?;

    if !program.is_active_on(new_transaction.transaction_date) {
        tracing::debug!(
            "Rejected transaction dated {} for program {} active {} to {}",
            new_transaction.transaction_date,
            program.id,
            program.start_date,
            program.end_date
        );
        return Err(Error::OutOfWindow);
    }

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (amount, transaction_date, rebate_program_id, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, amount, transaction_date, rebate_program_id, created_at",
        )?
        .query_row(
            (
                new_transaction.amount.to_string(),
                new_transaction.transaction_date,
                new_transaction.rebate_program_id,
                OffsetDateTime::now_utc(),
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::ProgramNotFound,
            error => error.into(),
        })?;

    tracing::info!(
        "Submitted transaction {} of {} against program {}",
        transaction.id,
        transaction.amount,
        transaction.rebate_program_id
    );

    Ok(transaction)
}

/// Retrieve a live transaction by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if `id` does not refer to a transaction or it was deleted,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, amount, transaction_date, rebate_program_id, created_at
             FROM \"transaction\"
             WHERE id = :id AND deleted_at IS NULL",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)
        .optional()?
        .ok_or(Error::TransactionNotFound)
}

/// Mark a transaction as deleted.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if `id` does not refer to a live transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        (OffsetDateTime::now_utc(), id),
    )?;

    if rows_affected == 0 {
        return Err(Error::TransactionNotFound);
    }

    tracing::info!("Deleted transaction {id}");

    Ok(())
}

/// Get the `limit` most recently submitted live transactions, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_recent_transactions(
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, amount, transaction_date, rebate_program_id, created_at
             FROM \"transaction\"
             WHERE deleted_at IS NULL
             ORDER BY created_at DESC, id DESC
             LIMIT :limit",
        )?
        .query_map(&[(":limit", &limit)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount TEXT NOT NULL,
                transaction_date TEXT NOT NULL,
                rebate_program_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                deleted_at TEXT,
                FOREIGN KEY(rebate_program_id) REFERENCES rebate_program(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = get_decimal(row, 1)?;
    let transaction_date = row.get(2)?;
    let rebate_program_id = row.get(3)?;
    let created_at = row.get(4)?;

    Ok(Transaction {
        id,
        amount,
        transaction_date,
        rebate_program_id,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
