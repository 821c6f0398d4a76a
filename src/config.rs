//! Service-wide settings for rebate programs.

use rust_decimal::Decimal;

use crate::Error;

/// The settings that constrain which rebate programs may be registered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebateConfig {
    max_rebate_percentage: Decimal,
}

impl RebateConfig {
    /// Create a config that caps rebate percentages at `max_rebate_percentage`.
    ///
    /// # Errors
    /// Returns [Error::InvalidPercentage] if `max_rebate_percentage` is not between 0 and 100.
    pub fn new(max_rebate_percentage: Decimal) -> Result<Self, Error> {
        if max_rebate_percentage < Decimal::ZERO || max_rebate_percentage > Decimal::ONE_HUNDRED {
            return Err(Error::InvalidPercentage(max_rebate_percentage));
        }

        Ok(Self {
            max_rebate_percentage,
        })
    }

    /// The largest rebate percentage a program may offer.
    pub fn max_rebate_percentage(&self) -> Decimal {
        self.max_rebate_percentage
    }
}

impl Default for RebateConfig {
    fn default() -> Self {
        Self {
            max_rebate_percentage: Decimal::ONE_HUNDRED,
        }
    }
}
