//! Builds the claim summary report.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    claim::{ClaimStatus, RebateClaim, count_claims_by_status, get_recent_claims},
    program::{RebateProgram, get_recent_programs},
    transaction::{Transaction, get_recent_transactions},
};

/// How many rows each of the recent activity lists holds.
pub const RECENT_ACTIVITY_LIMIT: u32 = 10;

/// The number of claims with a given status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    /// The claim status.
    pub status: ClaimStatus,
    /// How many live claims in the range have this status.
    pub count: u64,
}

/// Claim counts for a date range plus the latest activity across the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSummary {
    /// The first claim date included in the counts.
    pub start_date: Date,
    /// The last claim date included in the counts.
    pub end_date: Date,
    /// Live claims in the range grouped by status. Statuses with no claims are left out.
    pub status_counts: Vec<StatusCount>,
    /// The sum of `status_counts`.
    pub total: u64,
    /// The most recently registered live programs, newest first.
    pub recent_programs: Vec<RebateProgram>,
    /// The most recently submitted live transactions, newest first.
    pub recent_transactions: Vec<Transaction>,
    /// The most recently filed live claims, newest first.
    pub recent_claims: Vec<RebateClaim>,
}

/// Summarise the claims filed between `start_date` and `end_date` inclusive.
///
/// The recent activity lists are not limited to the date range.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidRange] if `start_date` is after `end_date`,
/// - or [Error::SqlError] if there is some SQL error.
pub fn get_claim_summary(
    start_date: Date,
    end_date: Date,
    connection: &Connection,
) -> Result<ClaimSummary, Error> {
    if start_date > end_date {
        return Err(Error::InvalidRange);
    }

    let status_counts: Vec<StatusCount> = count_claims_by_status(start_date, end_date, connection)?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    let total = status_counts.iter().map(|status_count| status_count.count).sum();

    Ok(ClaimSummary {
        start_date,
        end_date,
        status_counts,
        total,
        recent_programs: get_recent_programs(RECENT_ACTIVITY_LIMIT, connection)?,
        recent_transactions: get_recent_transactions(RECENT_ACTIVITY_LIMIT, connection)?,
        recent_claims: get_recent_claims(RECENT_ACTIVITY_LIMIT, connection)?,
    })
}

#[cfg(test)]
mod report_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        claim::{ClaimStatus, delete_claim, insert_claim},
        db::initialize,
        program::{create_rebate_program, test_utils::new_program},
        transaction::{NewTransaction, submit_transaction},
    };

    use super::{RECENT_ACTIVITY_LIMIT, StatusCount, get_claim_summary};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn submit_transactions(count: usize, connection: &Connection) -> Vec<i64> {
        let program = create_rebate_program(
            &new_program(dec!(10), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            dec!(100),
            connection,
        )
        .unwrap();

        (0..count)
            .map(|_| {
                submit_transaction(
                    &NewTransaction {
                        amount: dec!(50.00),
                        transaction_date: date!(2024 - 03 - 01),
                        rebate_program_id: program.id,
                    },
                    connection,
                )
                .unwrap()
                .id
            })
            .collect()
    }

    #[test]
    fn rejects_inverted_range() {
        let connection = get_test_connection();

        let result = get_claim_summary(date!(2025 - 06 - 01), date!(2025 - 01 - 01), &connection);

        assert_eq!(result, Err(Error::InvalidRange));
    }

    #[test]
    fn empty_database_gives_empty_summary() {
        let connection = get_test_connection();

        let summary =
            get_claim_summary(date!(2024 - 01 - 01), date!(2024 - 12 - 31), &connection).unwrap();

        assert!(summary.status_counts.is_empty());
        assert_eq!(summary.total, 0);
        assert!(summary.recent_programs.is_empty());
        assert!(summary.recent_transactions.is_empty());
        assert!(summary.recent_claims.is_empty());
    }

    #[test]
    fn counts_only_live_claims_in_range() {
        let connection = get_test_connection();
        let transaction_ids = submit_transactions(4, &connection);
        insert_claim(transaction_ids[0], dec!(5.00), date!(2024 - 03 - 02), &connection).unwrap();
        insert_claim(transaction_ids[1], dec!(5.00), date!(2024 - 03 - 31), &connection).unwrap();
        // Outside the range.
        insert_claim(transaction_ids[2], dec!(5.00), date!(2024 - 04 - 01), &connection).unwrap();
        let deleted =
            insert_claim(transaction_ids[3], dec!(5.00), date!(2024 - 03 - 10), &connection)
                .unwrap();
        delete_claim(deleted.id, &connection).unwrap();

        let summary =
            get_claim_summary(date!(2024 - 03 - 01), date!(2024 - 03 - 31), &connection).unwrap();

        assert_eq!(
            summary.status_counts,
            vec![StatusCount {
                status: ClaimStatus::Pending,
                count: 2
            }]
        );
        assert_eq!(summary.total, 2);
        // Recent activity ignores the range but still hides deleted rows.
        assert_eq!(summary.recent_claims.len(), 3);
    }

    #[test]
    fn recent_lists_are_newest_first_and_limited() {
        let connection = get_test_connection();
        let transaction_ids = submit_transactions(RECENT_ACTIVITY_LIMIT as usize + 2, &connection);

        let summary =
            get_claim_summary(date!(2024 - 01 - 01), date!(2024 - 12 - 31), &connection).unwrap();

        assert_eq!(
            summary.recent_transactions.len(),
            RECENT_ACTIVITY_LIMIT as usize
        );
        assert_eq!(
            summary.recent_transactions[0].id,
            *transaction_ids.last().unwrap()
        );
        assert_eq!(summary.recent_programs.len(), 1);
    }
}
