//! Implements a struct that holds the state of the REST server.

use crate::{claim::AdvisoryLocks, config::RebateConfig, db::Database};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database that stores programs, transactions and claims.
    pub database: Database,

    /// The per-transaction locks that serialise claim settlement.
    pub settlement_locks: AdvisoryLocks,

    /// Limits applied when registering rebate programs.
    pub rebate_config: RebateConfig,
}

impl AppState {
    /// Create a new [AppState] over an already opened `database`.
    pub fn new(database: Database, rebate_config: RebateConfig) -> Self {
        Self {
            database,
            settlement_locks: AdvisoryLocks::new(),
            rebate_config,
        }
    }
}
