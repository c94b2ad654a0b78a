//! # Money Module
//!
//! Provides the `Money` pair (amount + currency) and the fixed-point helpers
//! shared by conversion and formatting.
//!
//! ## Why Decimal?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │    95 / 0.95 = 100.00000000000001   ❌ WRONG!                           │
//! │                                                                         │
//! │  Integer cents do not help here either: a cart mixes currencies with   │
//! │  0, 2 and 3 decimal places, and rates arrive as "0.95", "3.6725"...    │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal (96-bit mantissa, base-10 scale)            │
//! │    95 / 0.95 = 100                   ✅ exact                           │
//! │    Rounding happens ONLY at display / settlement precision             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::money::{format_fixed, minor_unit, Money};
//!
//! let price = Money::new(Decimal::new(1099, 2), 1); // 10.99 in currency #1
//! assert_eq!(price.currency_id, 1);
//!
//! assert_eq!(format_fixed(Decimal::new(25, 1), 0), "3");
//! assert_eq!(minor_unit(2), Decimal::new(1, 2)); // 0.01
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Identifier of a currency in the loaded currency directory.
pub type CurrencyId = i64;

/// Largest `decimalPlaces` a currency may declare.
///
/// Keeps `10^-places` and fixed-point formatting well inside the
/// 28-digit scale rust_decimal supports.
pub const MAX_DECIMAL_PLACES: u32 = 12;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount together with the currency it is denominated in.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CartLineItem.selling()    ──┐                                          │
/// │  CartLineItem.line_total() ──┼──► CurrencySet::convert_money(..., ccy) │
/// │  CartLineItem.discount()   ──┤                                          │
/// │  Tender.money()            ──┘                                          │
/// │                                                                         │
/// │  The line item stores amount and currency id as separate wire fields;  │
/// │  Money is the in-process view that keeps them together.                 │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: Decimal,
    pub currency_id: CurrencyId,
}

impl Money {
    /// Creates a Money value.
    #[inline]
    pub const fn new(amount: Decimal, currency_id: CurrencyId) -> Self {
        Money {
            amount,
            currency_id,
        }
    }
}

// =============================================================================
// Fixed-Point Helpers
// =============================================================================

/// Rounds to `places` decimal places, half away from zero.
///
/// A result of zero is returned as positive zero so that a remaining amount
/// of `-0.000001` never shows up as `-0.00`.
pub fn round_to_places(amount: Decimal, places: u32) -> Decimal {
    let rounded = amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Drops digits beyond `places` decimal places (rounds toward zero).
pub fn truncate_to_places(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::ToZero)
}

/// Formats an amount as fixed-point text with exactly `places` decimals.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::money::format_fixed;
///
/// assert_eq!(format_fixed(Decimal::new(10, 0), 2), "10.00");
/// assert_eq!(format_fixed(Decimal::new(12345, 3), 2), "12.35");
/// ```
pub fn format_fixed(amount: Decimal, places: u32) -> String {
    let rounded = round_to_places(amount, places);
    format!("{:.*}", places as usize, rounded)
}

/// The smallest step an input in a currency with `places` decimals may take.
///
/// `minor_unit(2) = 0.01`, `minor_unit(0) = 1`.
#[inline]
pub fn minor_unit(places: u32) -> Decimal {
    Decimal::new(1, places.min(MAX_DECIMAL_PLACES))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_truncate_to_places() {
        assert_eq!(truncate_to_places(dec!(184.5), 0), dec!(184));
        assert_eq!(truncate_to_places(dec!(1.239), 2), dec!(1.23));
        assert_eq!(truncate_to_places(dec!(7), 2), dec!(7));
    }

    #[test]
    fn test_round_to_places() {
        assert_eq!(round_to_places(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_to_places(dec!(-2.345), 2), dec!(-2.35));
        assert_eq!(round_to_places(dec!(2.5), 0), dec!(3));
        assert_eq!(round_to_places(dec!(-0.0001), 2), Decimal::ZERO);
        assert!(!round_to_places(dec!(-0.0001), 2).is_sign_negative());
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(dec!(10), 2), "10.00");
        assert_eq!(format_fixed(dec!(2.5), 0), "3");
        assert_eq!(format_fixed(dec!(1.23456), 3), "1.235");
        assert_eq!(format_fixed(dec!(-0.001), 2), "0.00");
    }

    #[test]
    fn test_minor_unit() {
        assert_eq!(minor_unit(0), dec!(1));
        assert_eq!(minor_unit(2), dec!(0.01));
        assert_eq!(minor_unit(3), dec!(0.001));
    }
}
