//! Defines the core data models and database queries for rebate programs.

use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{Error, claim::CURRENCY_DECIMAL_PLACES, database_id::ProgramId, db::get_decimal};

// ============================================================================
// MODELS
// ============================================================================

/// A time-bounded offer that refunds a percentage of a transaction's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateProgram {
    /// The ID of the program.
    pub id: ProgramId,
    /// A human readable name for the program.
    pub program_name: String,
    /// The share of a transaction's amount that is refunded, from 0 to 100.
    pub rebate_percentage: Decimal,
    /// The first day a transaction may be dated to be eligible.
    pub start_date: Date,
    /// The last day a transaction may be dated to be eligible.
    pub end_date: Date,
    /// Free text describing who or what qualifies for the rebate.
    pub eligibility_criteria: String,
    /// When the program was registered.
    pub created_at: OffsetDateTime,
}

impl RebateProgram {
    /// Whether `date` falls inside the program's eligibility window, inclusive of both ends.
    pub fn is_active_on(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// The data needed to register a new rebate program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRebateProgram {
    /// A human readable name for the program.
    pub program_name: String,
    /// The share of a transaction's amount that is refunded.
    pub rebate_percentage: Decimal,
    /// The first day of the eligibility window.
    pub start_date: Date,
    /// The last day of the eligibility window.
    pub end_date: Date,
    /// Free text describing who or what qualifies for the rebate.
    pub eligibility_criteria: String,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Register a new rebate program.
///
/// `max_percentage` is the largest rebate percentage the service allows.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidProgramName] if the program name is blank,
/// - [Error::InvalidPercentage] if the percentage is negative, greater than `max_percentage`,
///   or has more than two decimal places,
/// - [Error::InvalidDateRange] if the start date is after the end date,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_rebate_program(
    new_program: &NewRebateProgram,
    max_percentage: Decimal,
    connection: &Connection,
) -> Result<RebateProgram, Error> {
    if new_program.program_name.trim().is_empty() {
        return Err(Error::InvalidProgramName);
    }

    if new_program.rebate_percentage < Decimal::ZERO
        || new_program.rebate_percentage > max_percentage
        || new_program.rebate_percentage.normalize().scale() > CURRENCY_DECIMAL_PLACES
    {
        return Err(Error::InvalidPercentage(new_program.rebate_percentage));
    }

    if new_program.start_date > new_program.end_date {
        return Err(Error::InvalidDateRange);
    }

    let program = connection
        .prepare(
            "INSERT INTO rebate_program
                (program_name, rebate_percentage, start_date, end_date, eligibility_criteria, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, program_name, rebate_percentage, start_date, end_date, eligibility_criteria, created_at",
        )?
        .query_row(
            (
                &new_program.program_name,
                new_program.rebate_percentage.to_string(),
                new_program.start_date,
                new_program.end_date,
                &new_program.eligibility_criteria,
                OffsetDateTime::now_utc(),
            ),
            map_program_row,
        )?;

    tracing::info!(
        "Created rebate program {} \"{}\" at {}% from {} to {}",
        program.id,
        program.program_name,
        program.rebate_percentage,
        program.start_date,
        program.end_date
    );

    Ok(program)
}

/// Retrieve a live rebate program by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::ProgramNotFound] if `id` does not refer to a program or the program was deleted,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_rebate_program(id: ProgramId, connection: &Connection) -> Result<RebateProgram, Error> {
    connection
        .prepare(
            "SELECT id, program_name, rebate_percentage, start_date, end_date, eligibility_criteria, created_at
             FROM rebate_program
             WHERE id = :id AND deleted_at IS NULL",
        )?
        .query_row(&[(":id", &id)], map_program_row)
        .optional()?
        .ok_or(Error::ProgramNotFound)
}

/// Mark a rebate program as deleted.
///
/// The row is kept so that existing transactions still reference it, but it
/// is hidden from every read.
///
/// # Errors
/// This function will return a:
/// - [Error::ProgramNotFound] if `id` does not refer to a live program,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_rebate_program(id: ProgramId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE rebate_program SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        (OffsetDateTime::now_utc(), id),
    )?;

    if rows_affected == 0 {
        return Err(Error::ProgramNotFound);
    }

    tracing::info!("Deleted rebate program {id}");

    Ok(())
}

/// Get the `limit` most recently created live programs, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_recent_programs(limit: u32, connection: &Connection) -> Result<Vec<RebateProgram>, Error> {
    connection
        .prepare(
            "SELECT id, program_name, rebate_percentage, start_date, end_date, eligibility_criteria, created_at
             FROM rebate_program
             WHERE deleted_at IS NULL
             ORDER BY created_at DESC, id DESC
             LIMIT :limit",
        )?
        .query_map(&[(":limit", &limit)], map_program_row)?
        .map(|maybe_program| maybe_program.map_err(Error::from))
        .collect()
}

/// Create the rebate program table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_program_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS rebate_program (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                program_name TEXT NOT NULL,
                rebate_percentage TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                eligibility_criteria TEXT NOT NULL,
                created_at TEXT NOT NULL,
                deleted_at TEXT,
                CHECK (start_date <= end_date)
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [RebateProgram].
pub fn map_program_row(row: &Row) -> Result<RebateProgram, rusqlite::Error> {
    let id = row.get(0)?;
    let program_name = row.get(1)?;
    let rebate_percentage = get_decimal(row, 2)?;
    let start_date = row.get(3)?;
    let end_date = row.get(4)?;
    let eligibility_criteria = row.get(5)?;
    let created_at = row.get(6)?;

    Ok(RebateProgram {
        id,
        program_name,
        rebate_percentage,
        start_date,
        end_date,
        eligibility_criteria,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        program::{
            create_rebate_program, delete_rebate_program, get_rebate_program, get_recent_programs,
        },
    };

    use super::test_utils::new_program;

    const MAX_PERCENTAGE: rust_decimal::Decimal = rust_decimal::Decimal::ONE_HUNDRED;

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let want = new_program(dec!(15.00), date!(2024 - 01 - 01), date!(2024 - 12 - 31));

        let program = create_rebate_program(&want, MAX_PERCENTAGE, &conn).unwrap();

        assert!(program.id > 0);
        assert_eq!(program.program_name, want.program_name);
        assert_eq!(program.rebate_percentage, dec!(15.00));
        assert_eq!(program.start_date, want.start_date);
        assert_eq!(program.end_date, want.end_date);
        assert_eq!(program.eligibility_criteria, want.eligibility_criteria);
    }

    #[test]
    fn create_accepts_maximum_percentage() {
        let conn = get_test_connection();

        let result = create_rebate_program(
            &new_program(dec!(100), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        );

        assert!(result.is_ok(), "want Ok, got {result:?}");
    }

    #[test]
    fn create_accepts_zero_percentage() {
        let conn = get_test_connection();

        let result = create_rebate_program(
            &new_program(dec!(0), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        );

        assert!(result.is_ok(), "want Ok, got {result:?}");
    }

    #[test]
    fn create_fails_on_percentage_over_maximum() {
        let conn = get_test_connection();

        let result = create_rebate_program(
            &new_program(dec!(101), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidPercentage(dec!(101))));
    }

    #[test]
    fn create_fails_on_percentage_over_configured_maximum() {
        let conn = get_test_connection();

        let result = create_rebate_program(
            &new_program(dec!(50.01), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            dec!(50),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidPercentage(dec!(50.01))));
    }

    #[test]
    fn create_fails_on_sub_hundredth_percentage() {
        let conn = get_test_connection();

        let result = create_rebate_program(
            &new_program(dec!(12.3456789), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidPercentage(dec!(12.3456789))));
    }

    #[test]
    fn create_accepts_trailing_zeros_in_percentage() {
        let conn = get_test_connection();

        let result = create_rebate_program(
            &new_program(dec!(12.500), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        );

        assert!(result.is_ok(), "want Ok, got {result:?}");
    }

    #[test]
    fn create_fails_on_negative_percentage() {
        let conn = get_test_connection();

        let result = create_rebate_program(
            &new_program(dec!(-0.5), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidPercentage(dec!(-0.5))));
    }

    #[test]
    fn create_fails_when_start_is_after_end() {
        let conn = get_test_connection();

        let result = create_rebate_program(
            &new_program(dec!(10), date!(2024 - 12 - 31), date!(2024 - 01 - 01)),
            MAX_PERCENTAGE,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidDateRange));
    }

    #[test]
    fn create_accepts_single_day_window() {
        let conn = get_test_connection();

        let result = create_rebate_program(
            &new_program(dec!(10), date!(2024 - 06 - 01), date!(2024 - 06 - 01)),
            MAX_PERCENTAGE,
            &conn,
        );

        assert!(result.is_ok(), "want Ok, got {result:?}");
    }

    #[test]
    fn create_fails_on_blank_name() {
        let conn = get_test_connection();
        let mut program = new_program(dec!(10), date!(2024 - 01 - 01), date!(2024 - 12 - 31));
        program.program_name = "   ".to_owned();

        let result = create_rebate_program(&program, MAX_PERCENTAGE, &conn);

        assert_eq!(result, Err(Error::InvalidProgramName));
    }

    #[test]
    fn get_returns_created_program() {
        let conn = get_test_connection();
        let created = create_rebate_program(
            &new_program(dec!(12.5), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        )
        .unwrap();

        let got = get_rebate_program(created.id, &conn);

        assert_eq!(got, Ok(created));
    }

    #[test]
    fn get_fails_on_missing_program() {
        let conn = get_test_connection();

        assert_eq!(get_rebate_program(42, &conn), Err(Error::ProgramNotFound));
    }

    #[test]
    fn get_excludes_deleted_program() {
        let conn = get_test_connection();
        let created = create_rebate_program(
            &new_program(dec!(12.5), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        )
        .unwrap();

        delete_rebate_program(created.id, &conn).unwrap();

        assert_eq!(
            get_rebate_program(created.id, &conn),
            Err(Error::ProgramNotFound)
        );
    }

    #[test]
    fn delete_keeps_row() {
        let conn = get_test_connection();
        let created = create_rebate_program(
            &new_program(dec!(12.5), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        )
        .unwrap();

        delete_rebate_program(created.id, &conn).unwrap();

        let row_count: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM rebate_program WHERE id = ?1 AND deleted_at IS NOT NULL",
                [created.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(row_count, 1);
    }

    #[test]
    fn delete_twice_fails() {
        let conn = get_test_connection();
        let created = create_rebate_program(
            &new_program(dec!(12.5), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        )
        .unwrap();
        delete_rebate_program(created.id, &conn).unwrap();

        let result = delete_rebate_program(created.id, &conn);

        assert_eq!(result, Err(Error::ProgramNotFound));
    }

    #[test]
    fn recent_programs_are_newest_first_and_limited() {
        let conn = get_test_connection();
        for _ in 0..12 {
            create_rebate_program(
                &new_program(dec!(5), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
                MAX_PERCENTAGE,
                &conn,
            )
            .unwrap();
        }

        let recent = get_recent_programs(10, &conn).unwrap();

        let ids: Vec<_> = recent.iter().map(|program| program.id).collect();
        assert_eq!(ids, (3..=12).rev().collect::<Vec<_>>());
    }

    #[test]
    fn recent_programs_exclude_deleted() {
        let conn = get_test_connection();
        let kept = create_rebate_program(
            &new_program(dec!(5), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        )
        .unwrap();
        let deleted = create_rebate_program(
            &new_program(dec!(5), date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            MAX_PERCENTAGE,
            &conn,
        )
        .unwrap();
        delete_rebate_program(deleted.id, &conn).unwrap();

        let recent = get_recent_programs(10, &conn).unwrap();

        assert_eq!(recent, vec![kept]);
    }
}
