//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState,
    claim::{
        calculate_rebate_endpoint, claim_rebate_endpoint, delete_claim_endpoint,
        get_claim_endpoint,
    },
    endpoints,
    logging::logging_middleware,
    program::{create_program_endpoint, delete_program_endpoint, get_program_endpoint},
    report::get_claim_summary_endpoint,
    transaction::{
        delete_transaction_endpoint, get_transaction_endpoint, submit_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::REBATE_PROGRAMS, post(create_program_endpoint))
        .route(
            endpoints::REBATE_PROGRAM,
            get(get_program_endpoint).delete(delete_program_endpoint),
        )
        .route(endpoints::TRANSACTIONS, post(submit_transaction_endpoint))
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_REBATE,
            get(calculate_rebate_endpoint),
        )
        .route(
            endpoints::REBATE_CLAIMS,
            post(claim_rebate_endpoint).get(get_claim_summary_endpoint),
        )
        .route(
            endpoints::REBATE_CLAIM,
            get(get_claim_endpoint).delete(delete_claim_endpoint),
        )
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}
