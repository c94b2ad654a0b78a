//! # Currency Conversion Service
//!
//! Pivot-through-base exchange arithmetic over a read-only snapshot of the
//! currency directory.
//!
//! ## Pivot Conversion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every rate is quoted against ONE base currency (rate(base) = 1)        │
//! │                                                                         │
//! │      amount (from) ──── ÷ rate(from) ────► base ──── × rate(to) ────►  │
//! │                                                          amount (to)    │
//! │                                                                         │
//! │  USD (base, 1)   EUR (0.95)                                             │
//! │    convert(100, USD, EUR) = 100 ÷ 1    × 0.95 = 95                      │
//! │    convert(95,  EUR, USD) = 95  ÷ 0.95 × 1    = 100                     │
//! │                                                                         │
//! │  Same currency on both sides: amount returned untouched (no rounding)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups of an id that is not in the set are hard errors
//! ([`CoreError::UnknownCurrency`]) and are logged; the service never
//! substitutes another currency.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{format_fixed, minor_unit, CurrencyId, Money, MAX_DECIMAL_PLACES};

// =============================================================================
// Currency
// =============================================================================

/// One entry of the currency directory.
///
/// ## Wire Format
/// ```json
/// { "id": 2, "code": "EUR", "exchangeRateToBase": "0.95",
///   "decimalPlaces": 2, "isBaseCurrency": false }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Currency {
    pub id: CurrencyId,

    /// ISO-style code shown to the cashier ("USD", "EUR").
    pub code: String,

    /// Units of this currency per one unit of the base currency.
    #[ts(type = "string")]
    pub exchange_rate_to_base: Decimal,

    /// Minor-unit precision used for formatting and input steps.
    pub decimal_places: u32,

    #[serde(rename = "isBaseCurrency", alias = "isBase")]
    pub is_base: bool,
}

impl Currency {
    /// Convenience constructor, mostly for fixtures.
    pub fn new(
        id: CurrencyId,
        code: impl Into<String>,
        exchange_rate_to_base: Decimal,
        decimal_places: u32,
        is_base: bool,
    ) -> Self {
        Currency {
            id,
            code: code.into(),
            exchange_rate_to_base,
            decimal_places,
            is_base,
        }
    }
}

// =============================================================================
// Currency Set
// =============================================================================

/// The currently loaded currency directory.
///
/// ## Invariants (checked in [`CurrencySet::new`])
/// - at least one currency
/// - exactly one base currency, whose rate is 1
/// - every rate strictly positive
/// - ids unique, decimal places within [`MAX_DECIMAL_PLACES`]
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencySet {
    currencies: Vec<Currency>,
    base_index: usize,
}

impl CurrencySet {
    /// Validates a directory snapshot and builds the conversion service.
    pub fn new(currencies: Vec<Currency>) -> CoreResult<Self> {
        if currencies.is_empty() {
            return Err(invalid_set("no currencies loaded"));
        }

        let mut base_index = None;
        for (index, currency) in currencies.iter().enumerate() {
            if currencies[..index].iter().any(|c| c.id == currency.id) {
                return Err(invalid_set(format!("duplicate currency id {}", currency.id)));
            }
            if currency.exchange_rate_to_base <= Decimal::ZERO {
                return Err(invalid_set(format!(
                    "{} has a non-positive exchange rate {}",
                    currency.code, currency.exchange_rate_to_base
                )));
            }
            if currency.decimal_places > MAX_DECIMAL_PLACES {
                return Err(invalid_set(format!(
                    "{} declares {} decimal places (max {})",
                    currency.code, currency.decimal_places, MAX_DECIMAL_PLACES
                )));
            }
            if currency.is_base {
                if base_index.is_some() {
                    return Err(invalid_set("more than one base currency"));
                }
                if currency.exchange_rate_to_base != Decimal::ONE {
                    return Err(invalid_set(format!(
                        "base currency {} must have rate 1, got {}",
                        currency.code, currency.exchange_rate_to_base
                    )));
                }
                base_index = Some(index);
            }
        }

        let base_index = base_index.ok_or_else(|| invalid_set("no base currency"))?;

        tracing::debug!(
            count = currencies.len(),
            base = %currencies[base_index].code,
            "currency set loaded"
        );

        Ok(CurrencySet {
            currencies,
            base_index,
        })
    }

    /// The base currency every rate pivots through.
    pub fn base(&self) -> &Currency {
        &self.currencies[self.base_index]
    }

    /// Looks up a currency by id.
    pub fn get(&self, id: CurrencyId) -> Option<&Currency> {
        self.currencies.iter().find(|c| c.id == id)
    }

    /// Looks up a currency by id, failing loudly when it is missing.
    pub fn require(&self, id: CurrencyId) -> CoreResult<&Currency> {
        self.get(id).ok_or_else(|| {
            tracing::error!(currency_id = id, "unknown currency referenced");
            CoreError::UnknownCurrency { id }
        })
    }

    /// Case-insensitive lookup by code ("eur" finds "EUR").
    pub fn by_code(&self, code: &str) -> Option<&Currency> {
        self.currencies
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
    }

    /// Iterates the loaded currencies in directory order.
    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.iter()
    }

    /// Number of loaded currencies.
    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    /// Always false for a constructed set; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Converts `amount` from one currency to another through the base.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::currency::{Currency, CurrencySet};
    ///
    /// let set = CurrencySet::new(vec![
    ///     Currency::new(1, "USD", Decimal::ONE, 2, true),
    ///     Currency::new(2, "EUR", Decimal::new(95, 2), 2, false),
    /// ]).unwrap();
    ///
    /// assert_eq!(set.convert(Decimal::new(100, 0), 1, 2).unwrap(), Decimal::new(95, 0));
    /// assert_eq!(set.convert(Decimal::new(95, 0), 2, 1).unwrap(), Decimal::new(100, 0));
    /// ```
    pub fn convert(&self, amount: Decimal, from: CurrencyId, to: CurrencyId) -> CoreResult<Decimal> {
        if from == to {
            return Ok(amount);
        }

        let from_rate = self.require(from)?.exchange_rate_to_base;
        let to_rate = self.require(to)?.exchange_rate_to_base;

        let in_base = amount
            .checked_div(from_rate)
            .ok_or(CoreError::ArithmeticOverflow {
                context: "conversion to base currency",
            })?;
        in_base
            .checked_mul(to_rate)
            .ok_or(CoreError::ArithmeticOverflow {
                context: "conversion from base currency",
            })
    }

    /// Converts a [`Money`] value into `to`.
    pub fn convert_money(&self, money: Money, to: CurrencyId) -> CoreResult<Money> {
        let amount = self.convert(money.amount, money.currency_id, to)?;
        Ok(Money::new(amount, to))
    }

    /// Converts an amount expressed in the base currency into `to`.
    pub fn from_base(&self, amount: Decimal, to: CurrencyId) -> CoreResult<Decimal> {
        self.convert(amount, self.base().id, to)
    }

    /// Converts an amount in `from` into the base currency.
    pub fn to_base(&self, amount: Decimal, from: CurrencyId) -> CoreResult<Decimal> {
        self.convert(amount, from, self.base().id)
    }

    // =========================================================================
    // Formatting
    // =========================================================================

    /// Fixed-point text using the currency's `decimalPlaces`.
    ///
    /// `format_price(2.5, JPY)` with 0 places is `"3"`.
    pub fn format_price(&self, amount: Decimal, currency_id: CurrencyId) -> CoreResult<String> {
        let currency = self.require(currency_id)?;
        Ok(format_fixed(amount, currency.decimal_places))
    }

    /// Input granularity for the currency: `10^(-decimalPlaces)`.
    pub fn decimal_step(&self, currency_id: CurrencyId) -> CoreResult<Decimal> {
        let currency = self.require(currency_id)?;
        Ok(minor_unit(currency.decimal_places))
    }
}

fn invalid_set(reason: impl Into<String>) -> CoreError {
    CoreError::InvalidCurrencySet {
        reason: reason.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
