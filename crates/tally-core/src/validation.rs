//! # Validation Module
//!
//! Per-field input schema for cart edits and ledger actions, plus the
//! field-keyed error store the register UI reads back.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Edit Pipeline                                      │
//! │                                                                         │
//! │  FieldEdit::Quantity(-1)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_edit() ← THIS MODULE                                         │
//! │       │                                                                 │
//! │       ├── Err → FieldErrors.record(line, Quantity, msg)                │
//! │       │         draft untouched, caller gets CoreError::Validation      │
//! │       │                                                                 │
//! │       └── Ok  → FieldErrors.clear(line, Quantity)                      │
//! │                 rule table runs (line_item::apply_edit)                │
//! │                 soft stock check → optional StockWarning               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::validation::{validate_discount_percent, validate_quantity};
//!
//! assert!(validate_quantity(Decimal::new(5, 0)).is_ok());
//! assert!(validate_discount_percent(Decimal::new(101, 0)).is_err());
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::line_item::{EditField, FieldEdit};
use crate::{MAX_CART_ITEMS, MAX_NOTES_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price-like field (selling price, line total, discount).
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, no discount)
pub fn validate_price(field: EditField, value: Decimal) -> ValidationResult<()> {
    if value < Decimal::ZERO {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be within `[0, ∞)`
/// - Fractional quantities are allowed (weighed goods)
pub fn validate_quantity(qty: Decimal) -> ValidationResult<()> {
    if qty < Decimal::ZERO {
        return Err(ValidationError::Negative {
            field: EditField::Quantity.to_string(),
        });
    }

    Ok(())
}

/// Validates a discount percentage.
///
/// ## Rules
/// - Must be between 0 and 100 inclusive
pub fn validate_discount_percent(percent: Decimal) -> ValidationResult<()> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: EditField::DiscountPercent.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates free-text notes (line or sale level).
///
/// ## Rules
/// - Maximum MAX_NOTES_LENGTH characters
pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::TooLong {
            field: EditField::Notes.to_string(),
            max: MAX_NOTES_LENGTH,
        });
    }

    Ok(())
}

/// Validates the cart-level discount amount.
pub fn validate_discount_amount(amount: Decimal) -> ValidationResult<()> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::Negative {
            field: "discountAmount".to_string(),
        });
    }

    Ok(())
}

/// Validates a tender amount.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Cannot pay zero or negative amounts
pub fn validate_payment_amount(amount: Decimal) -> ValidationResult<()> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates cart size (number of distinct lines).
///
/// ## Rules
/// - Must not exceed MAX_CART_ITEMS (100)
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

/// Runs the schema for whichever field an edit targets.
pub fn validate_edit(edit: &FieldEdit) -> ValidationResult<()> {
    match edit {
        FieldEdit::SellingPrice(v) => validate_price(EditField::SellingPrice, *v),
        FieldEdit::LineTotal(v) => validate_price(EditField::LineTotal, *v),
        FieldEdit::DiscountPrice(v) => validate_price(EditField::DiscountPrice, *v),
        FieldEdit::DiscountPercent(v) => validate_discount_percent(*v),
        FieldEdit::Quantity(v) => validate_quantity(*v),
        FieldEdit::Notes(text) => validate_notes(text),
    }
}

// =============================================================================
// Field Error Store
// =============================================================================

/// Latest validation message per (line item, field).
///
/// A failed validation records the message; the next successful validation
/// of the same key removes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    messages: BTreeMap<(String, EditField), String>,
}

impl FieldErrors {
    /// Records a failure for a line/field pair, replacing any older message.
    pub fn record(&mut self, line_id: &str, field: EditField, error: &ValidationError) {
        self.messages
            .insert((line_id.to_string(), field), error.to_string());
    }

    /// Clears the message for a line/field pair.
    pub fn clear(&mut self, line_id: &str, field: EditField) {
        self.messages.remove(&(line_id.to_string(), field));
    }

    /// Drops every message belonging to a removed line.
    pub fn clear_line(&mut self, line_id: &str) {
        self.messages.retain(|(line, _), _| line != line_id);
    }

    /// The current message for a line/field pair.
    pub fn get(&self, line_id: &str, field: EditField) -> Option<&str> {
        self.messages
            .get(&(line_id.to_string(), field))
            .map(String::as_str)
    }

    /// All messages for one line, in field order.
    pub fn for_line<'a>(&'a self, line_id: &'a str) -> impl Iterator<Item = (EditField, &'a str)> {
        self.messages
            .iter()
            .filter(move |((line, _), _)| line == line_id)
            .map(|((_, field), message)| (*field, message.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_price() {
        assert!(validate_price(EditField::SellingPrice, dec!(0)).is_ok());
        assert!(validate_price(EditField::SellingPrice, dec!(10.99)).is_ok());
        assert!(validate_price(EditField::LineTotal, dec!(-0.01)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(dec!(0)).is_ok());
        assert!(validate_quantity(dec!(1.5)).is_ok());
        assert!(validate_quantity(dec!(100000)).is_ok());
        assert!(validate_quantity(dec!(-1)).is_err());
    }

    #[test]
    fn test_validate_discount_percent() {
        assert!(validate_discount_percent(dec!(0)).is_ok());
        assert!(validate_discount_percent(dec!(12.5)).is_ok());
        assert!(validate_discount_percent(dec!(100)).is_ok());
        assert!(validate_discount_percent(dec!(100.01)).is_err());
        assert!(validate_discount_percent(dec!(-1)).is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert!(validate_notes("").is_ok());
        assert!(validate_notes("gift wrap").is_ok());
        assert!(validate_notes(&"é".repeat(MAX_NOTES_LENGTH)).is_ok());
        assert!(validate_notes(&"a".repeat(MAX_NOTES_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(dec!(0.01)).is_ok());
        assert!(validate_payment_amount(dec!(0)).is_err());
        assert!(validate_payment_amount(dec!(-5)).is_err());
    }

    #[test]
    fn test_validate_edit_dispatch() {
        assert!(validate_edit(&FieldEdit::Quantity(dec!(2))).is_ok());
        assert!(validate_edit(&FieldEdit::DiscountPercent(dec!(150))).is_err());
        assert!(validate_edit(&FieldEdit::Notes("ok".into())).is_ok());
        assert!(validate_edit(&FieldEdit::SellingPrice(dec!(-1))).is_err());
    }

    #[test]
    fn test_field_errors_record_and_clear() {
        let mut errors = FieldErrors::default();
        let err = validate_quantity(dec!(-1)).unwrap_err();

        errors.record("line-1", EditField::Quantity, &err);
        errors.record("line-2", EditField::Notes, &err);
        assert_eq!(
            errors.get("line-1", EditField::Quantity),
            Some("quantity cannot be negative")
        );
        assert_eq!(errors.for_line("line-1").count(), 1);

        errors.clear("line-1", EditField::Quantity);
        assert!(errors.get("line-1", EditField::Quantity).is_none());

        errors.clear_line("line-2");
        assert!(errors.is_empty());
    }
}
