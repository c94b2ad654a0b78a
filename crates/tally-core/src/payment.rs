//! # Payment Ledger
//!
//! Tender collection against a draft, with overpayment clamping.
//!
//! ## Clamping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total 100 USD, paid 60 USD            remaining = 40 USD               │
//! │                                                                         │
//! │  add_payment(50 EUR)                                                    │
//! │       │  50 EUR = 52.63 USD > 40 USD                                    │
//! │       ▼                                                                 │
//! │  stored as convert(40, USD → EUR) = 38 EUR    remaining = 0             │
//! │                                                                         │
//! │  add_payment(anything)  ──► CoreError::NothingOwed (no mutation)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The remaining amount is derived from the draft on every call and never
//! cached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::currency::CurrencySet;
use crate::draft::SaleDraft;
use crate::error::{CoreError, CoreResult};
use crate::money::{round_to_places, truncate_to_places, CurrencyId, Money};
use crate::validation::validate_payment_amount;

// =============================================================================
// Tender
// =============================================================================

/// A recorded payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Tender {
    /// Unique within the draft, never reused after a delete.
    pub id: String,

    #[ts(type = "string")]
    pub amount: Decimal,

    pub currency_id: CurrencyId,

    pub cash_drawer_id: Option<i64>,
}

impl Tender {
    #[inline]
    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency_id)
    }
}

/// A payment the cashier is about to add (no id yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewTender {
    #[ts(type = "string")]
    pub amount: Decimal,
    pub currency_id: CurrencyId,
    #[serde(default)]
    pub cash_drawer_id: Option<i64>,
}

impl NewTender {
    pub fn new(amount: Decimal, currency_id: CurrencyId) -> Self {
        NewTender {
            amount,
            currency_id,
            cash_drawer_id: None,
        }
    }

    pub fn with_cash_drawer(mut self, cash_drawer_id: i64) -> Self {
        self.cash_drawer_id = Some(cash_drawer_id);
        self
    }
}

// =============================================================================
// Ledger Operations
// =============================================================================

impl SaleDraft {
    /// Adds a tender, clamping it to what is still owed.
    ///
    /// ## Returns
    /// - `Ok(Tender)` as stored (amount may be lower than offered)
    /// - `Err(Validation)` for a zero or negative amount
    /// - `Err(NothingOwed)` when the sale is already covered
    /// - `Err(RemainderBelowMinorUnit)` when what is owed cannot be paid in
    ///   whole minor units of the tender's currency
    pub fn add_payment(&mut self, tender: NewTender, currencies: &CurrencySet) -> CoreResult<Tender> {
        validate_payment_amount(tender.amount)?;
        currencies.require(tender.currency_id)?;

        if self.final_amount(currencies)? <= Decimal::ZERO {
            return Err(CoreError::NothingOwed);
        }

        let outstanding = self.outstanding(currencies)?;
        let offered =
            currencies.convert(tender.amount, tender.currency_id, self.settlement_currency_id)?;

        let amount = if offered > outstanding {
            let clamped = self.clamp_to_outstanding(outstanding, tender.currency_id, currencies)?;
            tracing::warn!(
                draft_id = %self.id,
                offered = %tender.amount,
                accepted = %clamped,
                currency = tender.currency_id,
                "tender clamped to remaining amount"
            );
            clamped
        } else {
            tender.amount
        };

        self.next_payment_seq += 1;
        let stored = Tender {
            id: self.next_payment_seq.to_string(),
            amount,
            currency_id: tender.currency_id,
            cash_drawer_id: tender.cash_drawer_id,
        };

        tracing::debug!(
            draft_id = %self.id,
            payment_id = %stored.id,
            amount = %stored.amount,
            currency = stored.currency_id,
            "payment added"
        );
        self.payments.push(stored.clone());
        Ok(stored)
    }

    /// Removes a tender by id.
    pub fn delete_payment(&mut self, payment_id: &str) -> CoreResult<Tender> {
        let index = self
            .payments
            .iter()
            .position(|p| p.id == payment_id)
            .ok_or_else(|| CoreError::PaymentNotFound(payment_id.to_string()))?;

        let removed = self.payments.remove(index);
        tracing::debug!(draft_id = %self.id, payment_id, "payment deleted");
        Ok(removed)
    }

    /// Σ tenders in the settlement currency.
    pub fn total_paid(&self, currencies: &CurrencySet) -> CoreResult<Decimal> {
        self.payments.iter().try_fold(Decimal::ZERO, |acc, p| {
            Ok(acc + currencies.convert_money(p.money(), self.settlement_currency_id)?.amount)
        })
    }

    /// What the customer still owes, rounded to the settlement currency.
    ///
    /// `total − customer credit − Σ tenders`. Zero means the sale can be
    /// submitted.
    pub fn final_amount(&self, currencies: &CurrencySet) -> CoreResult<Decimal> {
        let places = currencies.require(self.settlement_currency_id)?.decimal_places;
        Ok(round_to_places(self.outstanding(currencies)?, places))
    }

    /// The remaining amount expressed as a tender in `currency_id`, at that
    /// currency's precision.
    ///
    /// Rounded to the nearest minor unit when that does not overpay at the
    /// settlement currency's precision, otherwise rounded down.
    fn clamp_to_outstanding(
        &self,
        outstanding: Decimal,
        currency_id: CurrencyId,
        currencies: &CurrencySet,
    ) -> CoreResult<Decimal> {
        let places = currencies.require(currency_id)?.decimal_places;
        let settle_places = currencies.require(self.settlement_currency_id)?.decimal_places;
        let exact = currencies.convert(outstanding, self.settlement_currency_id, currency_id)?;

        let nearest = round_to_places(exact, places);
        let value = currencies.convert(nearest, currency_id, self.settlement_currency_id)?;
        let amount = if round_to_places(value - outstanding, settle_places) <= Decimal::ZERO {
            nearest
        } else {
            truncate_to_places(exact, places)
        };

        if amount <= Decimal::ZERO {
            return Err(CoreError::RemainderBelowMinorUnit { currency_id });
        }
        Ok(amount)
    }

    /// Unrounded remaining amount in the settlement currency.
    pub(crate) fn outstanding(&self, currencies: &CurrencySet) -> CoreResult<Decimal> {
        Ok(self.total_amount(currencies)?
            - self.credit_in_settlement(currencies)?
            - self.total_paid(currencies)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::tests::{currencies, draft_with, inventory};
    use crate::error::ValidationError;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_remaining_after_partial_payment() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.add_payment(NewTender::new(dec!(60), 1), &set).unwrap();

        assert_eq!(draft.total_paid(&set).unwrap(), dec!(60));
        assert_eq!(draft.final_amount(&set).unwrap(), dec!(40));
    }

    #[test]
    fn test_overpayment_is_clamped() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.add_payment(NewTender::new(dec!(60), 1), &set).unwrap();

        let stored = draft.add_payment(NewTender::new(dec!(50), 2), &set).unwrap();
        assert_eq!(stored.money(), Money::new(dec!(38), 2));
        assert_eq!(draft.final_amount(&set).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_clamped_tender_respects_minor_unit() {
        let (mut draft, set) = draft_with(dec!(1.23));

        // 1.23 USD is 184.5 JPY; yen has no fractional unit
        let stored = draft.add_payment(NewTender::new(dec!(1000), 3), &set).unwrap();
        assert_eq!(stored.money(), Money::new(dec!(185), 3));
        assert_eq!(draft.overpayment(&set).unwrap(), Decimal::ZERO);
        assert_eq!(draft.final_amount(&set).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_remainder_below_minor_unit() {
        let (mut draft, set) = draft_with(dec!(1.23));
        draft.add_payment(NewTender::new(dec!(1.225), 1), &set).unwrap();
        assert_eq!(draft.final_amount(&set).unwrap(), dec!(0.01));

        // A whole cent would overpay by half a cent
        assert_eq!(
            draft.add_payment(NewTender::new(dec!(1), 1), &set),
            Err(CoreError::RemainderBelowMinorUnit { currency_id: 1 })
        );
        assert_eq!(draft.payments().len(), 1);

        // One yen (0.0067 USD) overshoots by less than a cent
        let stored = draft.add_payment(NewTender::new(dec!(5), 3), &set).unwrap();
        assert_eq!(stored.amount, dec!(1));
        assert_eq!(draft.final_amount(&set).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_nothing_owed_rejects_without_mutation() {
        let (mut draft, set) = draft_with(dec!(10));
        draft.add_payment(NewTender::new(dec!(10), 1), &set).unwrap();

        assert_eq!(
            draft.add_payment(NewTender::new(dec!(1), 1), &set),
            Err(CoreError::NothingOwed)
        );
        assert_eq!(draft.payments().len(), 1);

        let mut empty = SaleDraft::new(1);
        assert_eq!(
            empty.add_payment(NewTender::new(dec!(1), 1), &set),
            Err(CoreError::NothingOwed)
        );
    }

    #[test]
    fn test_non_positive_tender_fails_validation() {
        let (mut draft, set) = draft_with(dec!(10));
        assert!(matches!(
            draft.add_payment(NewTender::new(dec!(0), 1), &set),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(draft.add_payment(NewTender::new(dec!(5), 99), &set).is_err());
        assert!(draft.payments().is_empty());
    }

    #[test]
    fn test_payment_ids_are_never_reused() {
        let (mut draft, set) = draft_with(dec!(100));
        let a = draft.add_payment(NewTender::new(dec!(10), 1), &set).unwrap();
        let b = draft.add_payment(NewTender::new(dec!(10), 1), &set).unwrap();
        let c = draft.add_payment(NewTender::new(dec!(10), 1), &set).unwrap();

        draft.delete_payment(&b.id).unwrap();
        let d = draft.add_payment(NewTender::new(dec!(10), 1), &set).unwrap();

        let ids: Vec<&str> = draft.payments().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), c.id.as_str(), d.id.as_str()]);
        assert_ne!(d.id, b.id);
        assert_ne!(d.id, c.id);
    }

    #[test]
    fn test_delete_unknown_payment() {
        let (mut draft, _) = draft_with(dec!(10));
        assert_eq!(
            draft.delete_payment("7"),
            Err(CoreError::PaymentNotFound("7".into()))
        );
    }

    #[test]
    fn test_cash_drawer_is_kept() {
        let (mut draft, set) = draft_with(dec!(10));
        let stored = draft
            .add_payment(NewTender::new(dec!(4), 1).with_cash_drawer(3), &set)
            .unwrap();
        assert_eq!(stored.cash_drawer_id, Some(3));
    }

    proptest! {
        /// Tenders plus credit never exceed the total, and what is owed
        /// never goes up, whatever sequence of tenders is offered.
        #[test]
        fn clamping_holds_for_any_tender_sequence(
            price_cents in 1i64..1_000_000,
            tenders in prop::collection::vec((1i64..500_000, 1i64..=3), 1..12),
        ) {
            let set = currencies();
            let mut draft = SaleDraft::new(1);
            draft.add_inventory_item(&inventory(1, Decimal::new(price_cents, 2)), &set).unwrap();

            let mut previous = draft.final_amount(&set).unwrap();
            for (cents, currency) in tenders {
                let _ = draft.add_payment(NewTender::new(Decimal::new(cents, 2), currency), &set);

                prop_assert_eq!(draft.overpayment(&set).unwrap(), Decimal::ZERO);

                let remaining = draft.final_amount(&set).unwrap();
                prop_assert!(remaining <= previous);
                prop_assert!(remaining >= Decimal::ZERO);
                previous = remaining;
            }
        }
    }
}
