//! Defines the endpoint for registering a new rebate program.

use axum::{
    Json,
    extract::{FromRef, State},
};

use crate::{
    AppState, Error,
    caller::Caller,
    config::RebateConfig,
    db::Database,
    program::{NewRebateProgram, RebateProgram, create_rebate_program},
};

/// The state needed to register a rebate program.
#[derive(Debug, Clone)]
pub struct CreateProgramState {
    /// The database for storing programs.
    pub database: Database,
    /// The limits on what programs may offer.
    pub rebate_config: RebateConfig,
}

impl FromRef<AppState> for CreateProgramState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            database: state.database.clone(),
            rebate_config: state.rebate_config,
        }
    }
}

/// A route handler for registering a rebate program, responds with the stored program.
pub async fn create_program_endpoint(
    State(state): State<CreateProgramState>,
    caller: Caller,
    Json(new_program): Json<NewRebateProgram>,
) -> Result<Json<RebateProgram>, Error> {
    let max_percentage = state.rebate_config.max_rebate_percentage();

    let program = state
        .database
        .run(move |connection| create_rebate_program(&new_program, max_percentage, connection))
        .await
        .inspect_err(|error| tracing::warn!("{caller} could not create rebate program: {error}"))?;

    tracing::info!("{caller} registered rebate program {}", program.id);

    Ok(Json(program))
}
