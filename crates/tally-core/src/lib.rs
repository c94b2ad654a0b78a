//! # tally-core: Cart Pricing & Settlement Engine
//!
//! Everything that keeps a multi-currency cart consistent lives here:
//! conversion, line item recalculation, the payment and customer ledgers,
//! and the settlement payload. No network, no disk, no async.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Register UI                                  │   │
//! │  │    Cart grid ──► Tender panel ──► Customer picker ──► Receipt   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              tally-checkout (session + coordinator)             │   │
//! │  │    CartSession, SubmissionCoordinator, BackendClient            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌───────────┐ ┌──────────┐ ┌──────────┐         │   │
//! │  │   │ currency │ │ line_item │ │ payment  │ │ customer │         │   │
//! │  │   │ convert  │ │ rule table│ │ clamping │ │ credit   │         │   │
//! │  │   └──────────┘ └───────────┘ └──────────┘ └──────────┘         │   │
//! │  │          └───────────┴──── draft ────┴──── payload              │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`currency`] - Currency directory and pivot-through-base conversion
//! - [`line_item`] - Cart lines and the per-field recalculation rules
//! - [`draft`] - The in-progress sale and its aggregates
//! - [`payment`] - Tenders and the overpayment clamp
//! - [`customer`] - Deferred balance (store credit) bookkeeping
//! - [`payload`] - Wire format of a finished sale
//! - [`money`] - Money pair and fixed-point helpers
//! - [`types`] - Read-only reference records from external directories
//! - [`validation`] - Per-field input schema
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Decimal Money**: amounts, rates and quantities are `rust_decimal::Decimal`
//! 2. **One Writer**: a `SaleDraft` changes only through its own methods
//! 3. **Reject, Don't Flag**: a change that would overpay the sale never lands
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::{Currency, CurrencySet, NewTender, SaleDraft};
//! # use tally_core::InventoryItem;
//!
//! let currencies = CurrencySet::new(vec![
//!     Currency::new(1, "USD", Decimal::ONE, 2, true),
//!     Currency::new(2, "EUR", Decimal::new(95, 2), 2, false),
//! ]).unwrap();
//!
//! let mut draft = SaleDraft::new(1);
//! # let item = InventoryItem {
//! #     id: 9, cost_price: Decimal::new(40, 0), cost_currency_id: 1,
//! #     selling_price: Decimal::new(100, 0), selling_currency_id: 1,
//! #     quantity_on_hand: Decimal::new(3, 0), unit_id: None, variant_id: None,
//! #     barcode: None, product_name: "Kettle".into(),
//! # };
//! draft.add_inventory_item(&item, &currencies).unwrap();
//!
//! // 95 EUR settles the 100 USD sale
//! draft.add_payment(NewTender::new(Decimal::new(95, 0), 2), &currencies).unwrap();
//! assert_eq!(draft.final_amount(&currencies).unwrap(), Decimal::ZERO);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod currency;
pub mod customer;
pub mod draft;
pub mod error;
pub mod line_item;
pub mod money;
pub mod payload;
pub mod payment;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use currency::{Currency, CurrencySet};
pub use customer::CustomerAccount;
pub use draft::{CartTotals, EditOutcome, SaleDraft};
pub use error::{CoreError, CoreResult, ValidationError};
pub use line_item::{CartLineItem, CurrencyField, EditField, FieldEdit, StockWarning};
pub use money::{CurrencyId, Money};
pub use payload::{SaleReceipt, SaleRequest, SaleRequestItem, SaleRequestPayment};
pub use payment::{NewTender, Tender};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single draft.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum length of line and sale notes, in characters.
pub const MAX_NOTES_LENGTH: usize = 500;
