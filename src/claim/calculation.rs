//! The rebate owed on a transaction.

use rust_decimal::{Decimal, RoundingStrategy};

/// The number of decimal places money is stored with.
pub const CURRENCY_DECIMAL_PLACES: u32 = 2;

/// Calculate the rebate owed on `amount` under a program offering `percentage`.
///
/// The product is exact and is rounded to cents once, with halves rounded
/// away from zero.
pub fn calculate_rebate_amount(amount: Decimal, percentage: Decimal) -> Decimal {
    (amount * percentage / Decimal::ONE_HUNDRED).round_dp_with_strategy(
        CURRENCY_DECIMAL_PLACES,
        RoundingStrategy::MidpointAwayFromZero,
    )
}
