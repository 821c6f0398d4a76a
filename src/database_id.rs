//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of a rebate program.
pub type ProgramId = DatabaseId;
/// The ID of a transaction submitted against a rebate program.
pub type TransactionId = DatabaseId;
/// The ID of a rebate claim.
pub type ClaimId = DatabaseId;
