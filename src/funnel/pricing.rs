//! Localized price strings.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Returned when a price cell does not parse as a number.
pub const PRICE_UNAVAILABLE: &str = "Precio no disponible";

/// Which currency a user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Local currency, amounts shown as stored.
    Local,
    /// Foreign currency, converted and rounded to whole units.
    Foreign,
}

/// Formats catalog amounts for a user's region.
#[derive(Debug, Clone)]
pub struct PriceFormatter {
    exchange_rate: Decimal,
    local_prefix: String,
}

impl PriceFormatter {
    /// `exchange_rate` is local units per foreign unit.
    pub fn new(exchange_rate: Decimal, local_prefix: impl Into<String>) -> Self {
        Self {
            exchange_rate,
            local_prefix: local_prefix.into(),
        }
    }

    /// Region flag from the leading digits of a user identity.
    pub fn region_of(&self, user_id: &str) -> Region {
        if user_id.starts_with(&self.local_prefix) {
            Region::Local
        } else {
            Region::Foreign
        }
    }

    /// Format `amount` (thousands separators allowed) for `region`.
    pub fn format(&self, region: Region, amount: &str) -> String {
        let Some(value) = parse_amount(amount) else {
            return PRICE_UNAVAILABLE.to_string();
        };

        match region {
            Region::Local => format!("S/ {}", value.normalize()),
            Region::Foreign => match value.checked_div(self.exchange_rate) {
                Some(converted) => format!(
                    "USD {}",
                    converted.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                ),
                None => PRICE_UNAVAILABLE.to_string(),
            },
        }
    }
}

fn parse_amount(amount: &str) -> Option<Decimal> {
    let cleaned: String = amount.trim().chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned).ok()
}
