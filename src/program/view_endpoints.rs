//! Endpoints for looking up and deleting a single rebate program.

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};

use crate::{
    AppState, Error,
    caller::Caller,
    database_id::ProgramId,
    db::Database,
    program::{RebateProgram, delete_rebate_program, get_rebate_program},
};

/// The state needed to read or delete a program.
#[derive(Debug, Clone)]
pub struct ProgramState {
    /// The database storing programs.
    pub database: Database,
}

impl FromRef<AppState> for ProgramState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            database: state.database.clone(),
        }
    }
}

/// A route handler for getting a live rebate program.
pub async fn get_program_endpoint(
    State(state): State<ProgramState>,
    Path(program_id): Path<ProgramId>,
) -> Result<Json<RebateProgram>, Error> {
    let program = state
        .database
        .run(move |connection| get_rebate_program(program_id, connection))
        .await?;

    Ok(Json(program))
}

/// A route handler for soft deleting a rebate program, responds with 204 No Content.
pub async fn delete_program_endpoint(
    State(state): State<ProgramState>,
    caller: Caller,
    Path(program_id): Path<ProgramId>,
) -> Result<StatusCode, Error> {
    state
        .database
        .run(move |connection| delete_rebate_program(program_id, connection))
        .await?;

    tracing::info!("{caller} deleted rebate program {program_id}");

    Ok(StatusCode::NO_CONTENT)
}
