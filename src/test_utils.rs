#![allow(missing_docs)]

use tempfile::TempDir;

use crate::{AppState, config::RebateConfig, db::Database};

/// An [AppState] over a fresh database file.
///
/// The database is deleted when the returned directory is dropped, so keep it alive for the
/// duration of the test.
pub(crate) fn get_test_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().expect("Could not create temporary directory.");
    let database = Database::open(dir.path().join("test.db"), crate::db::DEFAULT_BUSY_TIMEOUT)
        .expect("Could not open test database.");

    (dir, AppState::new(database, RebateConfig::default()))
}
