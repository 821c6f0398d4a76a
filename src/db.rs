//! Opening connections to the application database and creating its tables.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use rusqlite::{Connection, Row, Transaction as SqlTransaction, types::Type};
use rust_decimal::Decimal;

use crate::{
    Error, claim::create_claim_table, program::create_program_table,
    transaction::create_transaction_table,
};

/// How long a connection waits on a locked database file before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A handle to the SQLite database file.
///
/// Each unit of work opens its own connection with [Database::connect] so
/// that requests do not queue behind a single shared connection.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Open the database at `path`, creating the file and tables if needed.
    ///
    /// The database is switched to WAL mode so that readers do not block the
    /// writer.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the file cannot be opened or the tables
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, Error> {
        let database = Self {
            path: path.as_ref().to_owned(),
            busy_timeout,
        };

        let connection = database.connect()?;
        let journal_mode: String =
            connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Opened database {:?} in {journal_mode} mode", database.path);
        initialize(&connection)?;

        Ok(database)
    }

    /// Open a new connection to the database.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the connection cannot be opened or configured.
    pub fn connect(&self) -> Result<Connection, Error> {
        let connection = Connection::open(&self.path)?;
        connection.busy_timeout(self.busy_timeout)?;
        connection.pragma_update(None, "foreign_keys", true)?;

        Ok(connection)
    }

    /// Run `work` against a fresh connection on the blocking thread pool.
    ///
    /// The work runs to completion even if the awaiting request is dropped,
    /// so any storage transaction it opens is always committed or rolled back.
    ///
    /// # Errors
    /// Returns the error produced by `work`, an [Error::SqlError] if the
    /// connection cannot be opened, or an [Error::TaskFailed] if the task panicked.
    pub async fn run<T, F>(&self, work: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Connection) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let database = self.clone();

        tokio::task::spawn_blocking(move || {
            let mut connection = database.connect()?;
            work(&mut connection)
        })
        .await
        .map_err(|error| {
            tracing::error!("Database task failed to complete: {error}");
            Error::TaskFailed(error.to_string())
        })?
    }

    /// The path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create the application tables if they do not already exist.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_program_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_claim_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Read a decimal that was stored as text.
///
/// Decimals are stored as TEXT rather than REAL so that amounts keep their exact value.
pub(crate) fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    Decimal::from_str(&text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), initialize(&connection));
    }

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert_eq!(Ok(()), initialize(&connection));
    }

    #[test]
    fn enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let enabled: bool = connection
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();

        assert!(enabled);
    }
}
