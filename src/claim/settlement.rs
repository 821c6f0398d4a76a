//! Claim settlement: deciding whether a transaction may be claimed and
//! recording the claim.
//!
//! Every settlement runs inside a [SettlementScope], which pairs the advisory
//! lock for the transaction with one SQLite transaction. Callers settling the
//! same transaction are totally ordered by the lock. Callers settling
//! different transactions only contend on SQLite's own write lock.
//!
//! # Lock Ordering
//!
//! The advisory lock is always taken before the SQLite transaction begins.
//! A caller never holds the database write lock while waiting on an advisory
//! lock, so the two kinds of lock cannot deadlock.

use std::ops::Deref;

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    claim::{
        AdvisoryLockGuard, AdvisoryLocks, RebateClaim, calculate_rebate_amount,
        get_claim_for_transaction, insert_claim,
    },
    database_id::TransactionId,
    program::get_rebate_program,
    transaction::get_transaction,
};

/// A storage transaction that holds the settlement lock for one transaction ID.
///
/// Dropping the scope without calling [SettlementScope::commit] rolls back
/// the storage transaction and then releases the lock.
pub struct SettlementScope<'conn> {
    // Field order matters: the storage transaction must finish before the lock is released.
    sql_transaction: SqlTransaction<'conn>,
    lock: AdvisoryLockGuard,
}

impl<'conn> SettlementScope<'conn> {
    /// Take the lock for `transaction_id` and open a storage transaction with `behavior`.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the storage transaction cannot be started.
    /// The lock is released before returning in that case.
    pub fn begin(
        connection: &'conn mut Connection,
        locks: &AdvisoryLocks,
        transaction_id: TransactionId,
        behavior: TransactionBehavior,
    ) -> Result<Self, Error> {
        let lock = locks.lock(transaction_id);
        let sql_transaction = connection.transaction_with_behavior(behavior)?;

        Ok(Self {
            sql_transaction,
            lock,
        })
    }

    /// The transaction ID this scope is locked on.
    pub fn transaction_id(&self) -> TransactionId {
        self.lock.key()
    }

    /// Commit the storage transaction, then release the lock.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the commit fails. The storage
    /// transaction is rolled back and the lock released in that case.
    pub fn commit(self) -> Result<(), Error> {
        let Self {
            sql_transaction,
            lock,
        } = self;

        sql_transaction.commit()?;
        drop(lock);

        Ok(())
    }

    /// Roll back the storage transaction, then release the lock.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the rollback fails. The lock is still released.
    pub fn rollback(self) -> Result<(), Error> {
        let Self {
            sql_transaction,
            lock,
        } = self;

        sql_transaction.rollback()?;
        drop(lock);

        Ok(())
    }
}

impl Deref for SettlementScope<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.sql_transaction
    }
}

/// Claim the rebate on a transaction.
///
/// The claim amount is derived from the transaction amount and the program's
/// percentage as it is when the claim is made, not when the transaction was
/// submitted. Claims are always created as pending.
///
/// Nothing is written unless every check passes.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateClaim] if the transaction has already been claimed,
/// - [Error::TransactionNotFound] if the transaction does not exist or was deleted,
/// - [Error::ProgramNotFound] if the transaction's program does not exist or was deleted,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn claim_rebate(
    transaction_id: TransactionId,
    claim_date: Date,
    connection: &mut Connection,
    locks: &AdvisoryLocks,
) -> Result<RebateClaim, Error> {
    let scope = SettlementScope::begin(
        connection,
        locks,
        transaction_id,
        TransactionBehavior::Immediate,
    )?;

    match settle_claim(&scope, claim_date) {
        Ok(claim) => {
            scope.commit()?;
            tracing::info!(
                "Created rebate claim {} of {} for transaction {transaction_id}",
                claim.id,
                claim.claim_amount
            );
            Ok(claim)
        }
        Err(error) => {
            rollback_or_log(scope);
            Err(error)
        }
    }
}

/// Calculate the rebate a transaction would receive without claiming it.
///
/// Takes the same lock as [claim_rebate] so the transaction and program are
/// read as a consistent pair. Never writes.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if the transaction does not exist or was deleted,
/// - [Error::ProgramNotFound] if the transaction's program does not exist or was deleted,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn calculate_rebate(
    transaction_id: TransactionId,
    connection: &mut Connection,
    locks: &AdvisoryLocks,
) -> Result<Decimal, Error> {
    let scope = SettlementScope::begin(
        connection,
        locks,
        transaction_id,
        TransactionBehavior::Deferred,
    )?;

    let rebate = quote_rebate(&scope);
    rollback_or_log(scope);

    rebate.inspect_err(|error| {
        tracing::warn!("Could not calculate rebate for transaction {transaction_id}: {error}")
    })
}

fn settle_claim(scope: &SettlementScope<'_>, claim_date: Date) -> Result<RebateClaim, Error> {
    let transaction_id = scope.transaction_id();

    if let Some(existing_claim) = get_claim_for_transaction(transaction_id, scope)? {
        tracing::debug!(
            "Transaction {transaction_id} already has claim {}",
            existing_claim.id
        );
        return Err(Error::DuplicateClaim);
    }

    let claim_amount = quote_rebate(scope)?;

    insert_claim(transaction_id, claim_amount, claim_date, scope)
}

fn quote_rebate(scope: &SettlementScope<'_>) -> Result<Decimal, Error> {
    let transaction = get_transaction(scope.transaction_id(), scope)?;
    let program = get_rebate_program(transaction.rebate_program_id, scope)?;

    Ok(calculate_rebate_amount(
        transaction.amount,
        program.rebate_percentage,
    ))
}

/// Roll back `scope`, logging rather than returning a failure so the error
/// that caused the rollback is the one the caller sees.
fn rollback_or_log(scope: SettlementScope<'_>) {
    let transaction_id = scope.transaction_id();

    if let Err(error) = scope.rollback() {
        tracing::error!("Could not roll back settlement of transaction {transaction_id}: {error}");
    }
}
