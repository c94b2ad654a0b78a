//! # Cart Line Item Calculator
//!
//! One cart line and the directional rule table that keeps its numeric
//! fields consistent while the cashier edits any one of them.
//!
//! ## Rule Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Edited field      Recomputed        Formula                            │
//! │  ─────────────     ──────────        ───────                            │
//! │  sellingPrice  ──► lineTotal         convert(price × qty, sel → lt)     │
//! │  quantity      ──► lineTotal         convert(price × qty, sel → lt)     │
//! │  lineTotal     ──► quantity          total ÷ convert(price, sel → lt)   │
//! │                                      (skipped when price is zero)       │
//! │  discountPrice ──► discountPercent   disc(sel) ÷ total(sel) × 100       │
//! │                                      (0 when total is zero)             │
//! │  discountPct   ──► discountPrice     convert(total(sel) × pct ÷ 100,    │
//! │                                              sel → disc)                │
//! │  notes         ──► (nothing)                                            │
//! │                                                                         │
//! │  Exactly one forward computation per edit. No global re-solve, so the   │
//! │  recomputed field never feeds back into its own source.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Changing which currency a field is denominated in is a separate
//! operation ([`relabel_currency`]) that converts that one field and never
//! touches quantity or discount percent.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::currency::CurrencySet;
use crate::error::{CoreError, CoreResult};
use crate::money::{CurrencyId, Money};
use crate::types::InventoryItem;
use crate::validation::validate_edit;

// =============================================================================
// Cart Line Item
// =============================================================================

/// A single line in the draft.
///
/// ## Invariant
/// `line_total_price` equals `selling_price × quantity` expressed in
/// `line_total_currency_id`. A `LineTotal` edit on a free item has nothing
/// to derive quantity from and leaves the line untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineItem {
    /// Line id (UUID v4), stable for the life of the line.
    pub id: String,

    /// Inventory record this line sells.
    pub inventory_reference_id: i64,

    pub name: String,

    #[ts(type = "string")]
    pub quantity: Decimal,

    /// Stock on hand when the line was added (soft limit only).
    #[ts(type = "string")]
    pub available_quantity: Decimal,

    #[ts(type = "string")]
    pub selling_price: Decimal,
    pub selling_currency_id: CurrencyId,

    #[ts(type = "string")]
    pub line_total_price: Decimal,
    pub line_total_currency_id: CurrencyId,

    #[ts(type = "string")]
    pub discount_price: Decimal,
    pub discount_currency_id: CurrencyId,

    /// 0 to 100.
    #[ts(type = "string")]
    pub discount_percent: Decimal,

    #[ts(type = "string")]
    pub cost_price: Decimal,
    pub cost_currency_id: CurrencyId,

    pub unit_id: Option<i64>,

    #[serde(default)]
    pub notes: String,
}

impl CartLineItem {
    /// Maps an inventory record to a fresh line.
    ///
    /// Quantity starts at 1 with no discount, so the line total is simply
    /// the selling price in the selling currency.
    pub fn from_inventory(item: &InventoryItem) -> Self {
        CartLineItem {
            id: Uuid::new_v4().to_string(),
            inventory_reference_id: item.id,
            name: item.product_name.clone(),
            quantity: Decimal::ONE,
            available_quantity: item.quantity_on_hand,
            selling_price: item.selling_price,
            selling_currency_id: item.selling_currency_id,
            line_total_price: item.selling_price,
            line_total_currency_id: item.selling_currency_id,
            discount_price: Decimal::ZERO,
            discount_currency_id: item.selling_currency_id,
            discount_percent: Decimal::ZERO,
            cost_price: item.cost_price,
            cost_currency_id: item.cost_currency_id,
            unit_id: item.unit_id,
            notes: String::new(),
        }
    }

    #[inline]
    pub fn selling(&self) -> Money {
        Money::new(self.selling_price, self.selling_currency_id)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::new(self.line_total_price, self.line_total_currency_id)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::new(self.discount_price, self.discount_currency_id)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::new(self.cost_price, self.cost_currency_id)
    }

    /// Amount and currency of one currency-bearing field.
    pub fn money(&self, field: CurrencyField) -> Money {
        match field {
            CurrencyField::Selling => self.selling(),
            CurrencyField::LineTotal => self.line_total(),
            CurrencyField::Discount => self.discount(),
            CurrencyField::Cost => self.cost(),
        }
    }

    /// Soft stock check: a warning when more is requested than is on hand.
    pub fn stock_warning(&self) -> Option<StockWarning> {
        (self.quantity > self.available_quantity).then(|| StockWarning {
            line_id: self.id.clone(),
            requested: self.quantity,
            available: self.available_quantity,
        })
    }
}

// =============================================================================
// Edits
// =============================================================================

/// The fields a cashier can type into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum EditField {
    SellingPrice,
    LineTotal,
    DiscountPrice,
    DiscountPercent,
    Quantity,
    Notes,
}

impl fmt::Display for EditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EditField::SellingPrice => "sellingPrice",
            EditField::LineTotal => "lineTotalPrice",
            EditField::DiscountPrice => "discountPrice",
            EditField::DiscountPercent => "discountPercent",
            EditField::Quantity => "quantity",
            EditField::Notes => "notes",
        };
        f.write_str(name)
    }
}

/// One cashier edit: which field changed and its new value.
///
/// ## Wire Format
/// ```json
/// { "field": "discountPercent", "value": "10" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldEdit {
    SellingPrice(Decimal),
    LineTotal(Decimal),
    DiscountPrice(Decimal),
    DiscountPercent(Decimal),
    Quantity(Decimal),
    Notes(String),
}

impl FieldEdit {
    /// The field this edit targets.
    pub fn field(&self) -> EditField {
        match self {
            FieldEdit::SellingPrice(_) => EditField::SellingPrice,
            FieldEdit::LineTotal(_) => EditField::LineTotal,
            FieldEdit::DiscountPrice(_) => EditField::DiscountPrice,
            FieldEdit::DiscountPercent(_) => EditField::DiscountPercent,
            FieldEdit::Quantity(_) => EditField::Quantity,
            FieldEdit::Notes(_) => EditField::Notes,
        }
    }
}

/// The currency-bearing fields of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum CurrencyField {
    Selling,
    LineTotal,
    Discount,
    Cost,
}

/// Non-blocking notice that a line asks for more than is in stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockWarning {
    pub line_id: String,
    #[ts(type = "string")]
    pub requested: Decimal,
    #[ts(type = "string")]
    pub available: Decimal,
}

// =============================================================================
// Resolver
// =============================================================================

/// Applies one edit and returns the recomputed line.
///
/// The input line is never modified. A validation failure or an unknown
/// currency returns an error and produces no new line.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::currency::{Currency, CurrencySet};
/// use tally_core::line_item::{apply_edit, FieldEdit};
/// # use tally_core::types::InventoryItem;
/// # use tally_core::line_item::CartLineItem;
///
/// let set = CurrencySet::new(vec![Currency::new(1, "USD", Decimal::ONE, 2, true)]).unwrap();
/// # let inv = InventoryItem {
/// #     id: 1, cost_price: Decimal::ZERO, cost_currency_id: 1,
/// #     selling_price: Decimal::new(10, 0), selling_currency_id: 1,
/// #     quantity_on_hand: Decimal::new(5, 0), unit_id: None, variant_id: None,
/// #     barcode: None, product_name: "Mug".into(),
/// # };
/// let line = CartLineItem::from_inventory(&inv);
///
/// let line = apply_edit(&line, &FieldEdit::Quantity(Decimal::new(2, 0)), &set).unwrap();
/// assert_eq!(line.line_total_price, Decimal::new(20, 0));
///
/// let line = apply_edit(&line, &FieldEdit::DiscountPercent(Decimal::new(10, 0)), &set).unwrap();
/// assert_eq!(line.discount_price, Decimal::new(2, 0));
/// ```
pub fn apply_edit(
    item: &CartLineItem,
    edit: &FieldEdit,
    currencies: &CurrencySet,
) -> CoreResult<CartLineItem> {
    validate_edit(edit)?;

    let mut next = item.clone();
    match edit {
        FieldEdit::SellingPrice(price) => {
            next.selling_price = *price;
            next.line_total_price = derive_line_total(&next, currencies)?;
        }
        FieldEdit::Quantity(quantity) => {
            next.quantity = *quantity;
            next.line_total_price = derive_line_total(&next, currencies)?;
        }
        FieldEdit::LineTotal(total) => {
            let unit = currencies
                .convert_money(next.selling(), next.line_total_currency_id)?
                .amount;
            if unit.is_zero() {
                tracing::trace!(line_id = %next.id, "free item, line total edit skipped");
                return Ok(next);
            }
            next.quantity = total
                .checked_div(unit)
                .ok_or(CoreError::ArithmeticOverflow { context: "quantity" })?;
            next.line_total_price = *total;
        }
        FieldEdit::DiscountPrice(discount) => {
            next.discount_price = *discount;
            let total = currencies.convert(
                next.line_total_price,
                next.line_total_currency_id,
                next.selling_currency_id,
            )?;
            next.discount_percent = if total.is_zero() {
                Decimal::ZERO
            } else {
                let discount = currencies.convert(
                    *discount,
                    next.discount_currency_id,
                    next.selling_currency_id,
                )?;
                discount
                    .checked_div(total)
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                    .ok_or(CoreError::ArithmeticOverflow {
                        context: "discount percent",
                    })?
            };
        }
        FieldEdit::DiscountPercent(percent) => {
            next.discount_percent = *percent;
            let total = currencies.convert(
                next.line_total_price,
                next.line_total_currency_id,
                next.selling_currency_id,
            )?;
            let discount = total
                .checked_mul(*percent)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or(CoreError::ArithmeticOverflow {
                    context: "discount price",
                })?;
            next.discount_price =
                currencies.convert(discount, next.selling_currency_id, next.discount_currency_id)?;
        }
        FieldEdit::Notes(notes) => {
            next.notes = notes.clone();
        }
    }

    Ok(next)
}

/// Moves one field into another currency without cascading.
///
/// Only the stored amount of `field` is converted; quantity, discount
/// percent and every other amount stay exactly as they were.
pub fn relabel_currency(
    item: &CartLineItem,
    field: CurrencyField,
    currency_id: CurrencyId,
    currencies: &CurrencySet,
) -> CoreResult<CartLineItem> {
    currencies.require(currency_id)?;
    let moved = currencies.convert_money(item.money(field), currency_id)?;

    let mut next = item.clone();
    let (amount, current) = match field {
        CurrencyField::Selling => (&mut next.selling_price, &mut next.selling_currency_id),
        CurrencyField::LineTotal => (&mut next.line_total_price, &mut next.line_total_currency_id),
        CurrencyField::Discount => (&mut next.discount_price, &mut next.discount_currency_id),
        CurrencyField::Cost => (&mut next.cost_price, &mut next.cost_currency_id),
    };
    *amount = moved.amount;
    *current = moved.currency_id;

    Ok(next)
}

fn derive_line_total(item: &CartLineItem, currencies: &CurrencySet) -> CoreResult<Decimal> {
    let gross = item
        .selling_price
        .checked_mul(item.quantity)
        .ok_or(CoreError::ArithmeticOverflow {
            context: "line total",
        })?;
    currencies.convert(gross, item.selling_currency_id, item.line_total_currency_id)
}

// =============================================================================
// Unit Tests
// =============================================================================
