//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}',
//! tests build the URI with `format_endpoint`.

/// The route to register rebate programs.
pub const REBATE_PROGRAMS: &str = "/api/rebate-programs";
/// The route to access a single rebate program.
pub const REBATE_PROGRAM: &str = "/api/rebate-programs/{program_id}";
/// The route to submit transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to quote the rebate on a transaction.
pub const TRANSACTION_REBATE: &str = "/api/transactions/{transaction_id}/rebate";
/// The route to file claims and get the claim summary.
pub const REBATE_CLAIMS: &str = "/api/rebate-claims";
/// The route to access a single rebate claim.
pub const REBATE_CLAIM: &str = "/api/rebate-claims/{claim_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/rebate-claims/{claim_id}', '{claim_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |end| param_start + end + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
