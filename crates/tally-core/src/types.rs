//! # Reference Types
//!
//! Read-only records supplied by external collaborators (inventory and
//! customer directories). The engine never mutates these; it maps them into
//! its own draft types.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reference Data → Draft Data                          │
//! │                                                                         │
//! │  ┌─────────────────┐  from_inventory   ┌─────────────────┐             │
//! │  │ InventoryItem   │ ────────────────► │  CartLineItem   │             │
//! │  │  ─────────────  │                   │  ─────────────  │             │
//! │  │  id             │                   │  quantity = 1   │             │
//! │  │  sellingPrice   │                   │  discount = 0   │             │
//! │  │  quantityOnHand │                   │  lineTotal      │             │
//! │  └─────────────────┘                   └─────────────────┘             │
//! │                                                                         │
//! │  ┌─────────────────┐  attach_customer  ┌─────────────────┐             │
//! │  │ CustomerRecord  │ ────────────────► │ CustomerAccount │             │
//! │  │  id, name       │                   │ addedToAccount  │             │
//! │  │  balance        │                   │ (base currency) │             │
//! │  └─────────────────┘                   └─────────────────┘             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary fields accept either JSON numbers or decimal strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::CurrencyId;

// =============================================================================
// Inventory Item
// =============================================================================

/// A sellable inventory record as returned by the inventory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryItem {
    /// Inventory record id; becomes the line's `inventoryReferenceId`.
    pub id: i64,

    #[ts(type = "string")]
    pub cost_price: Decimal,
    pub cost_currency_id: CurrencyId,

    #[ts(type = "string")]
    pub selling_price: Decimal,
    pub selling_currency_id: CurrencyId,

    /// Stock on hand, used for the soft over-quantity warning.
    #[ts(type = "string")]
    pub quantity_on_hand: Decimal,

    #[serde(default)]
    pub unit_id: Option<i64>,

    #[serde(default)]
    pub variant_id: Option<i64>,

    #[serde(default)]
    pub barcode: Option<String>,

    /// Display name shown to cashier.
    pub product_name: String,
}

// =============================================================================
// Customer Record
// =============================================================================

/// One customer-search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerRecord {
    pub id: i64,
    pub name: String,

    /// Outstanding store-credit balance, base currency.
    #[ts(type = "string")]
    #[serde(default)]
    pub balance: Decimal,

    /// Deferred amount already earmarked for the current sale, base currency.
    #[ts(type = "string | null")]
    #[serde(default)]
    pub added_to_account: Option<Decimal>,
}

// =============================================================================
// Unit Tests
// =============================================================================
