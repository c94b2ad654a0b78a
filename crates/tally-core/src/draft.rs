//! # Sale Draft
//!
//! The mutable in-progress sale: lines, tenders, customer credit and the
//! cart-level fields around them.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Draft Lifecycle                                  │
//! │                                                                         │
//! │   SaleDraft::new() ──► id = fresh UUID                                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   add / edit / remove lines, payments, customer   (mutated in place)    │
//! │        │                                                                │
//! │        ├── clear()           ──► successor(): new id, same currency     │
//! │        │                                                                │
//! │        └── settled upstream  ──► successor(): new id, same currency     │
//! │                                                                         │
//! │   A draft is never partially reset.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settlement Guard
//! Every change that can lower the total is staged on a copy, checked
//! against what is already paid and credited, and only then committed.
//! Rejected changes leave the draft exactly as it was.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::currency::CurrencySet;
use crate::customer::CustomerAccount;
use crate::error::{CoreError, CoreResult};
use crate::line_item::{
    apply_edit, relabel_currency, CartLineItem, CurrencyField, FieldEdit, StockWarning,
};
use crate::money::{round_to_places, CurrencyId};
use crate::payment::Tender;
use crate::types::InventoryItem;
use crate::validation::{
    validate_cart_size, validate_discount_amount, validate_edit, validate_notes, FieldErrors,
};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Sale Draft
// =============================================================================

/// The sale being rung up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleDraft {
    /// Opaque session token, also used as the receipt id on submission.
    pub(crate) id: String,

    pub(crate) items: Vec<CartLineItem>,

    pub(crate) payments: Vec<Tender>,

    /// Cart-level discount, settlement currency.
    #[ts(type = "string")]
    pub(crate) discount_amount: Decimal,

    pub(crate) notes: String,

    #[ts(as = "Option<String>")]
    pub(crate) sale_date: Option<DateTime<Utc>>,

    pub(crate) settlement_currency_id: CurrencyId,

    pub(crate) customer: Option<CustomerAccount>,

    #[ts(as = "String")]
    pub(crate) created_at: DateTime<Utc>,

    /// Last tender number handed out; never decreases within a draft.
    #[serde(default)]
    #[ts(skip)]
    pub(crate) next_payment_seq: u64,

    #[serde(skip)]
    #[ts(skip)]
    pub(crate) field_errors: FieldErrors,
}

/// Result of a successful line edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EditOutcome {
    pub line_id: String,

    /// Set when the line now asks for more than is in stock.
    pub warning: Option<StockWarning>,
}

impl SaleDraft {
    /// Opens an empty sale settled in `settlement_currency_id`.
    pub fn new(settlement_currency_id: CurrencyId) -> Self {
        let draft = SaleDraft {
            id: Uuid::new_v4().to_string(),
            items: Vec::new(),
            payments: Vec::new(),
            discount_amount: Decimal::ZERO,
            notes: String::new(),
            sale_date: None,
            settlement_currency_id,
            customer: None,
            created_at: Utc::now(),
            next_payment_seq: 0,
            field_errors: FieldErrors::default(),
        };
        tracing::debug!(draft_id = %draft.id, currency = settlement_currency_id, "draft opened");
        draft
    }

    /// A fresh empty draft that keeps this draft's settlement currency.
    pub fn successor(&self) -> Self {
        SaleDraft::new(self.settlement_currency_id)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn item(&self, line_id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.id == line_id)
    }

    pub fn payments(&self) -> &[Tender] {
        &self.payments
    }

    pub fn discount_amount(&self) -> Decimal {
        self.discount_amount
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn sale_date(&self) -> Option<DateTime<Utc>> {
        self.sale_date
    }

    pub fn settlement_currency_id(&self) -> CurrencyId {
        self.settlement_currency_id
    }

    pub fn customer(&self) -> Option<&CustomerAccount> {
        self.customer.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Field-keyed validation messages from the latest edits.
    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // =========================================================================
    // Line Operations
    // =========================================================================

    /// Adds an inventory record to the cart.
    ///
    /// ## Behavior
    /// - Already in cart (same inventory id): quantity goes up by one
    /// - Not in cart: a new line with quantity 1 is appended
    pub fn add_inventory_item(
        &mut self,
        item: &InventoryItem,
        currencies: &CurrencySet,
    ) -> CoreResult<EditOutcome> {
        if let Some(existing) = self
            .items
            .iter()
            .find(|line| line.inventory_reference_id == item.id)
        {
            let line_id = existing.id.clone();
            let quantity = existing.quantity + Decimal::ONE;
            return self.edit_item(&line_id, FieldEdit::Quantity(quantity), currencies);
        }

        if validate_cart_size(self.items.len()).is_err() {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }
        currencies.require(item.selling_currency_id)?;
        currencies.require(item.cost_currency_id)?;

        let line = CartLineItem::from_inventory(item);
        tracing::debug!(
            draft_id = %self.id,
            line_id = %line.id,
            inventory_id = item.id,
            "line added"
        );

        let outcome = EditOutcome {
            line_id: line.id.clone(),
            warning: line.stock_warning(),
        };
        self.items.push(line);
        Ok(outcome)
    }

    /// Removes a line and any validation messages attached to it.
    pub fn remove_item(&mut self, line_id: &str, currencies: &CurrencySet) -> CoreResult<()> {
        let index = self.line_index(line_id)?;

        let mut candidate = self.clone();
        candidate.items.remove(index);
        candidate.field_errors.clear_line(line_id);
        self.commit_checked(candidate, currencies)?;

        tracing::debug!(draft_id = %self.id, line_id, "line removed");
        Ok(())
    }

    /// Applies a cashier edit to one line.
    ///
    /// A failed validation records a message under `(line, field)` and
    /// leaves the line untouched; a passing one clears that message.
    pub fn edit_item(
        &mut self,
        line_id: &str,
        edit: FieldEdit,
        currencies: &CurrencySet,
    ) -> CoreResult<EditOutcome> {
        let index = self.line_index(line_id)?;
        let field = edit.field();

        if let Err(err) = validate_edit(&edit) {
            tracing::debug!(draft_id = %self.id, line_id, %field, error = %err, "edit rejected");
            self.field_errors.record(line_id, field, &err);
            return Err(err.into());
        }
        self.field_errors.clear(line_id, field);

        let updated = apply_edit(&self.items[index], &edit, currencies)?;
        let warning = updated.stock_warning();
        if let Some(w) = &warning {
            tracing::info!(
                line_id,
                requested = %w.requested,
                available = %w.available,
                "quantity exceeds stock on hand"
            );
        }

        let mut candidate = self.clone();
        candidate.items[index] = updated;
        self.commit_checked(candidate, currencies)?;

        tracing::debug!(draft_id = %self.id, line_id, %field, "line edited");
        Ok(EditOutcome {
            line_id: line_id.to_string(),
            warning,
        })
    }

    /// Moves one amount of a line into another currency (no cascade).
    pub fn relabel_item_currency(
        &mut self,
        line_id: &str,
        field: CurrencyField,
        currency_id: CurrencyId,
        currencies: &CurrencySet,
    ) -> CoreResult<()> {
        let index = self.line_index(line_id)?;
        let updated = relabel_currency(&self.items[index], field, currency_id, currencies)?;

        let mut candidate = self.clone();
        candidate.items[index] = updated;
        self.commit_checked(candidate, currencies)
    }

    // =========================================================================
    // Cart-Level Fields
    // =========================================================================

    pub fn set_notes(&mut self, notes: impl Into<String>) -> CoreResult<()> {
        let notes = notes.into();
        validate_notes(&notes)?;
        self.notes = notes;
        Ok(())
    }

    /// Sets the cart-level discount (settlement currency).
    pub fn set_discount_amount(
        &mut self,
        amount: Decimal,
        currencies: &CurrencySet,
    ) -> CoreResult<()> {
        validate_discount_amount(amount)?;

        let mut candidate = self.clone();
        candidate.discount_amount = amount;
        self.commit_checked(candidate, currencies)?;

        tracing::debug!(draft_id = %self.id, %amount, "cart discount set");
        Ok(())
    }

    /// Backdates the sale; `None` means "stamp at submission".
    pub fn set_sale_date(&mut self, sale_date: Option<DateTime<Utc>>) {
        self.sale_date = sale_date;
    }

    /// Switches the currency totals are expressed in.
    ///
    /// The cart discount is converted along; payments and customer credit
    /// keep their own currencies.
    pub fn set_settlement_currency(
        &mut self,
        currency_id: CurrencyId,
        currencies: &CurrencySet,
    ) -> CoreResult<()> {
        currencies.require(currency_id)?;

        let mut candidate = self.clone();
        candidate.discount_amount =
            currencies.convert(self.discount_amount, self.settlement_currency_id, currency_id)?;
        candidate.settlement_currency_id = currency_id;
        self.commit_checked(candidate, currencies)?;

        tracing::debug!(draft_id = %self.id, currency = currency_id, "settlement currency changed");
        Ok(())
    }

    /// Explicit clear: replaced wholesale by an empty successor.
    pub fn clear(&mut self) {
        let next = self.successor();
        let retired = std::mem::replace(self, next);
        tracing::info!(retired = %retired.id, draft_id = %self.id, "draft cleared");
    }

    // =========================================================================
    // Aggregates (settlement currency)
    // =========================================================================

    /// Σ line totals.
    pub fn subtotal(&self, currencies: &CurrencySet) -> CoreResult<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |acc, line| {
            let total = currencies.convert_money(line.line_total(), self.settlement_currency_id)?;
            Ok(acc + total.amount)
        })
    }

    /// Σ line discounts.
    pub fn item_discounts(&self, currencies: &CurrencySet) -> CoreResult<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |acc, line| {
            let discount = currencies.convert_money(line.discount(), self.settlement_currency_id)?;
            Ok(acc + discount.amount)
        })
    }

    /// `max(0, subtotal − item discounts − cart discount)`.
    pub fn total_amount(&self, currencies: &CurrencySet) -> CoreResult<Decimal> {
        let total =
            self.subtotal(currencies)? - self.item_discounts(currencies)? - self.discount_amount;
        Ok(total.max(Decimal::ZERO))
    }

    pub fn total_quantity(&self) -> Decimal {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Display summary of the draft.
    pub fn totals(&self, currencies: &CurrencySet) -> CoreResult<CartTotals> {
        Ok(CartTotals {
            item_count: self.items.len(),
            total_quantity: self.total_quantity(),
            subtotal: self.subtotal(currencies)?,
            item_discounts: self.item_discounts(currencies)?,
            cart_discount: self.discount_amount,
            total: self.total_amount(currencies)?,
            paid: self.total_paid(currencies)?,
            added_to_account: self.credit_in_settlement(currencies)?,
            remaining: self.final_amount(currencies)?,
            currency_id: self.settlement_currency_id,
        })
    }

    /// Verifies tenders plus customer credit do not exceed the total when
    /// valued with `currencies`.
    ///
    /// Used before adopting a new rate snapshot: a tender recorded in a
    /// currency whose rate moved can be worth more than the sale.
    pub fn check_settlement(&self, currencies: &CurrencySet) -> CoreResult<()> {
        let excess = self.overpayment(currencies)?;
        if excess > Decimal::ZERO {
            return Err(CoreError::PaymentsExceedTotal { excess });
        }
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn line_index(&self, line_id: &str) -> CoreResult<usize> {
        self.items
            .iter()
            .position(|line| line.id == line_id)
            .ok_or_else(|| CoreError::LineItemNotFound(line_id.to_string()))
    }

    /// Amount by which tenders plus credit exceed the total, at the
    /// settlement currency's precision. Zero when the draft is consistent.
    pub(crate) fn overpayment(&self, currencies: &CurrencySet) -> CoreResult<Decimal> {
        let places = currencies.require(self.settlement_currency_id)?.decimal_places;
        let covered = self.total_paid(currencies)? + self.credit_in_settlement(currencies)?;
        let excess = round_to_places(covered - self.total_amount(currencies)?, places);
        Ok(excess.max(Decimal::ZERO))
    }

    fn commit_checked(&mut self, candidate: SaleDraft, currencies: &CurrencySet) -> CoreResult<()> {
        let excess = candidate.overpayment(currencies)?;
        if excess > Decimal::ZERO {
            tracing::warn!(draft_id = %self.id, %excess, "change would overpay the sale");
            return Err(CoreError::PaymentsExceedTotal { excess });
        }
        *self = candidate;
        Ok(())
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Cart totals summary for display, all in the settlement currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    #[ts(type = "string")]
    pub total_quantity: Decimal,
    #[ts(type = "string")]
    pub subtotal: Decimal,
    #[ts(type = "string")]
    pub item_discounts: Decimal,
    #[ts(type = "string")]
    pub cart_discount: Decimal,
    #[ts(type = "string")]
    pub total: Decimal,
    #[ts(type = "string")]
    pub paid: Decimal,
    #[ts(type = "string")]
    pub added_to_account: Decimal,
    #[ts(type = "string")]
    pub remaining: Decimal,
    pub currency_id: CurrencyId,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::error::ValidationError;
    use crate::line_item::EditField;
    use crate::payment::NewTender;
    use rust_decimal_macros::dec;

    pub(crate) fn currencies() -> CurrencySet {
        CurrencySet::new(vec![
            Currency::new(1, "USD", dec!(1), 2, true),
            Currency::new(2, "EUR", dec!(0.95), 2, false),
            Currency::new(3, "JPY", dec!(150), 0, false),
        ])
        .unwrap()
    }

    pub(crate) fn inventory(id: i64, price: Decimal) -> InventoryItem {
        InventoryItem {
            id,
            cost_price: price / dec!(2),
            cost_currency_id: 1,
            selling_price: price,
            selling_currency_id: 1,
            quantity_on_hand: dec!(5),
            unit_id: None,
            variant_id: None,
            barcode: None,
            product_name: format!("Item {}", id),
        }
    }

    /// A USD draft holding one line priced at `price`.
    pub(crate) fn draft_with(price: Decimal) -> (SaleDraft, CurrencySet) {
        let set = currencies();
        let mut draft = SaleDraft::new(1);
        draft.add_inventory_item(&inventory(1, price), &set).unwrap();
        (draft, set)
    }

    #[test]
    fn test_new_draft_is_empty() {
        let draft = SaleDraft::new(1);
        assert!(draft.is_empty());
        assert!(draft.payments().is_empty());
        assert_eq!(draft.notes(), "");
        assert!(draft.customer().is_none());
        assert!(Uuid::parse_str(draft.id()).is_ok());
    }

    #[test]
    fn test_add_same_inventory_increments_quantity() {
        let (mut draft, set) = draft_with(dec!(10));
        draft.add_inventory_item(&inventory(1, dec!(10)), &set).unwrap();

        assert_eq!(draft.items().len(), 1);
        assert_eq!(draft.items()[0].quantity, dec!(2));
        assert_eq!(draft.subtotal(&set).unwrap(), dec!(20));
    }

    #[test]
    fn test_add_item_with_unknown_currency() {
        let set = currencies();
        let mut draft = SaleDraft::new(1);
        let mut item = inventory(1, dec!(10));
        item.selling_currency_id = 404;
        assert_eq!(
            draft.add_inventory_item(&item, &set),
            Err(CoreError::UnknownCurrency { id: 404 })
        );
        assert!(draft.is_empty());
    }

    #[test]
    fn test_cart_size_limit() {
        let set = currencies();
        let mut draft = SaleDraft::new(1);
        for id in 0..MAX_CART_ITEMS as i64 {
            draft.add_inventory_item(&inventory(id, dec!(1)), &set).unwrap();
        }
        let err = draft
            .add_inventory_item(&inventory(10_000, dec!(1)), &set)
            .unwrap_err();
        assert_eq!(err, CoreError::CartTooLarge { max: MAX_CART_ITEMS });
    }

    #[test]
    fn test_edit_records_and_clears_field_errors() {
        let (mut draft, set) = draft_with(dec!(10));
        let line_id = draft.items()[0].id.clone();

        let err = draft
            .edit_item(&line_id, FieldEdit::DiscountPercent(dec!(120)), &set)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(draft.items()[0].discount_percent, Decimal::ZERO);
        assert!(draft
            .field_errors()
            .get(&line_id, EditField::DiscountPercent)
            .is_some());

        draft
            .edit_item(&line_id, FieldEdit::DiscountPercent(dec!(50)), &set)
            .unwrap();
        assert!(draft.field_errors().is_empty());
        assert_eq!(draft.items()[0].discount_price, dec!(5));
    }

    #[test]
    fn test_edit_returns_stock_warning_without_blocking() {
        let (mut draft, set) = draft_with(dec!(10));
        let line_id = draft.items()[0].id.clone();

        let outcome = draft
            .edit_item(&line_id, FieldEdit::Quantity(dec!(8)), &set)
            .unwrap();
        assert!(outcome.warning.is_some());
        assert_eq!(draft.items()[0].quantity, dec!(8));
    }

    #[test]
    fn test_edit_unknown_line() {
        let (mut draft, set) = draft_with(dec!(10));
        assert!(matches!(
            draft.edit_item("nope", FieldEdit::Quantity(dec!(1)), &set),
            Err(CoreError::LineItemNotFound(_))
        ));
    }

    #[test]
    fn test_totals() {
        let (mut draft, set) = draft_with(dec!(50));
        draft.add_inventory_item(&inventory(2, dec!(30)), &set).unwrap();
        let second = draft.items()[1].id.clone();
        draft
            .edit_item(&second, FieldEdit::DiscountPrice(dec!(5)), &set)
            .unwrap();
        draft.set_discount_amount(dec!(10), &set).unwrap();

        let totals = draft.totals(&set).unwrap();
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.subtotal, dec!(80));
        assert_eq!(totals.item_discounts, dec!(5));
        assert_eq!(totals.cart_discount, dec!(10));
        assert_eq!(totals.total, dec!(65));
        assert_eq!(totals.remaining, dec!(65));
    }

    #[test]
    fn test_total_never_negative() {
        let (mut draft, set) = draft_with(dec!(10));
        draft.set_discount_amount(dec!(25), &set).unwrap();
        assert_eq!(draft.total_amount(&set).unwrap(), Decimal::ZERO);
        assert!(draft.set_discount_amount(dec!(-1), &set).is_err());
    }

    #[test]
    fn test_lowering_total_below_payments_is_rejected() {
        let (mut draft, set) = draft_with(dec!(100));
        let line_id = draft.items()[0].id.clone();
        draft.add_payment(NewTender::new(dec!(100), 1), &set).unwrap();

        let err = draft
            .edit_item(&line_id, FieldEdit::SellingPrice(dec!(80)), &set)
            .unwrap_err();
        assert_eq!(err, CoreError::PaymentsExceedTotal { excess: dec!(20) });
        assert_eq!(draft.items()[0].selling_price, dec!(100));

        assert!(draft.remove_item(&line_id, &set).is_err());
        assert!(draft.set_discount_amount(dec!(1), &set).is_err());
        assert_eq!(draft.items().len(), 1);

        // Raising the total is always fine
        draft
            .edit_item(&line_id, FieldEdit::Quantity(dec!(2)), &set)
            .unwrap();
        assert_eq!(draft.final_amount(&set).unwrap(), dec!(100));
    }

    #[test]
    fn test_check_settlement_against_new_rates() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.add_payment(NewTender::new(dec!(95), 2), &set).unwrap();
        assert!(draft.check_settlement(&set).is_ok());

        // EUR halves against USD: the 95 EUR tender is now worth 190 USD
        let moved = CurrencySet::new(vec![
            Currency::new(1, "USD", dec!(1), 2, true),
            Currency::new(2, "EUR", dec!(0.5), 2, false),
        ])
        .unwrap();
        assert_eq!(
            draft.check_settlement(&moved),
            Err(CoreError::PaymentsExceedTotal { excess: dec!(90) })
        );
    }

    #[test]
    fn test_free_line_total_edit_keeps_cart_total() {
        let (mut draft, set) = draft_with(dec!(0));
        let line_id = draft.items()[0].id.clone();

        draft
            .edit_item(&line_id, FieldEdit::LineTotal(dec!(10)), &set)
            .unwrap();
        assert_eq!(draft.items()[0].line_total_price, Decimal::ZERO);
        assert_eq!(draft.total_amount(&set).unwrap(), Decimal::ZERO);
        assert!(matches!(
            draft.add_payment(NewTender::new(dec!(10), 1), &set),
            Err(CoreError::NothingOwed)
        ));
    }

    #[test]
    fn test_settlement_currency_switch_converts_discount() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.set_discount_amount(dec!(10), &set).unwrap();
        draft.set_settlement_currency(2, &set).unwrap();

        assert_eq!(draft.discount_amount(), dec!(9.5));
        assert_eq!(draft.total_amount(&set).unwrap(), dec!(85.5));
        assert!(draft.set_settlement_currency(99, &set).is_err());
    }

    #[test]
    fn test_notes_and_sale_date() {
        let mut draft = SaleDraft::new(1);
        draft.set_notes("deliver friday").unwrap();
        assert_eq!(draft.notes(), "deliver friday");
        assert!(draft.set_notes("x".repeat(501)).is_err());
        assert_eq!(draft.notes(), "deliver friday");

        let when = Utc::now();
        draft.set_sale_date(Some(when));
        assert_eq!(draft.sale_date(), Some(when));
    }

    #[test]
    fn test_clear_replaces_draft() {
        let (mut draft, set) = draft_with(dec!(10));
        draft.set_settlement_currency(2, &set).unwrap();
        let old_id = draft.id().to_string();

        draft.clear();
        assert!(draft.is_empty());
        assert_ne!(draft.id(), old_id);
        assert_eq!(draft.settlement_currency_id(), 2);
    }
}
