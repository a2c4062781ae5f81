//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    #[serde(default)]
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Price of `quantity` units, keeping the currency.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self {
            amount: self.amount * Decimal::from(quantity),
            currency_code: self.currency_code,
        }
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    ILS,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::ILS => "₪",
        }
    }
}
