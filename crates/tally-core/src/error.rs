//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Pricing / ledger rule failures                 │
//! │  └── ValidationError  - Per-field input validation failures            │
//! │                                                                         │
//! │  tally-checkout errors (separate crate)                                │
//! │  └── CheckoutError    - Submission, network and config failures        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → Register UI       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What is NOT an error
//! Two guards from the pricing rules are silent by design of the rule table
//! and never surface here:
//! - division by a zero selling price while deriving quantity (skipped)
//! - a tender larger than the remaining amount (clamped)

use rust_decimal::Decimal;
use thiserror::Error;

use crate::money::CurrencyId;

// =============================================================================
// Core Error
// =============================================================================

/// Core pricing and settlement errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A currency id is not part of the loaded currency set.
    ///
    /// ## When This Occurs
    /// - A line item still references a currency that was removed upstream
    /// - A tender is entered in a currency the register never loaded
    ///
    /// Never substituted with another currency.
    #[error("Unknown currency: {id}")]
    UnknownCurrency { id: CurrencyId },

    /// The currency directory snapshot is unusable.
    #[error("Invalid currency set: {reason}")]
    InvalidCurrencySet { reason: String },

    /// Decimal arithmetic left the representable range.
    #[error("Arithmetic overflow while computing {context}")]
    ArithmeticOverflow { context: &'static str },

    /// Line item is not in the draft.
    #[error("Line item not found: {0}")]
    LineItemNotFound(String),

    /// Tender is not in the draft.
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// A tender was offered while nothing is owed.
    #[error("Nothing left to pay on this sale")]
    NothingOwed,

    /// What is still owed is less than one minor unit of the tender's
    /// currency, so no tender in that currency can be accepted.
    #[error("Remaining amount is below the smallest unit of currency {currency_id}")]
    RemainderBelowMinorUnit { currency_id: CurrencyId },

    /// The change would leave tenders and customer credit above the total.
    ///
    /// ## User Workflow
    /// ```text
    /// Total 100, paid 100
    ///      │
    ///      ▼
    /// Cashier lowers quantity (total would become 80)
    ///      │
    ///      ▼
    /// PaymentsExceedTotal { excess: 20 }
    ///      │
    ///      ▼
    /// UI: "Remove a payment before lowering the total"
    /// ```
    #[error("Change rejected: payments would exceed the sale total by {excess}")]
    PaymentsExceedTotal { excess: Decimal },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Checked before any pricing rule runs; a failure never mutates the draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
