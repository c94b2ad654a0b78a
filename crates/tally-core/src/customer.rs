//! # Customer Account Ledger
//!
//! Deferred balance bookkeeping: part of a sale put "on account" for the
//! attached customer instead of being paid now.
//!
//! `added_to_account` is always held in the base currency so it survives a
//! change of settlement currency unchanged. It counts toward settlement
//! exactly like a tender and is clamped the same way.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::currency::CurrencySet;
use crate::draft::SaleDraft;
use crate::error::CoreResult;
use crate::types::CustomerRecord;

/// The customer attached to a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerAccount {
    pub customer_id: i64,

    pub name: String,

    /// Balance reported by the customer directory (base currency).
    #[ts(type = "string")]
    pub balance: Decimal,

    /// Amount of this sale deferred to the account (base currency).
    #[ts(type = "string | null")]
    pub added_to_account: Option<Decimal>,
}

impl SaleDraft {
    /// Attaches a customer-search result, replacing any previous customer.
    ///
    /// A deferred amount carried by the record is re-applied through
    /// [`SaleDraft::add_to_customer_account`], so it is clamped to what the
    /// current sale still owes. Recorded payments are left alone.
    pub fn attach_customer(
        &mut self,
        record: &CustomerRecord,
        currencies: &CurrencySet,
    ) -> CoreResult<()> {
        let carried = match record.added_to_account {
            Some(base) if base > Decimal::ZERO => {
                Some(currencies.from_base(base, self.settlement_currency_id)?)
            }
            _ => None,
        };

        self.customer = Some(CustomerAccount {
            customer_id: record.id,
            name: record.name.clone(),
            balance: record.balance,
            added_to_account: None,
        });
        tracing::info!(draft_id = %self.id, customer_id = record.id, "customer attached");

        if let Some(amount) = carried {
            self.add_to_customer_account(amount, currencies)?;
        }
        Ok(())
    }

    /// Drops the customer reference together with its deferred amount.
    pub fn detach_customer(&mut self) -> Option<CustomerAccount> {
        let previous = self.customer.take();
        if let Some(customer) = &previous {
            tracing::info!(draft_id = %self.id, customer_id = customer.customer_id, "customer detached");
        }
        previous
    }

    /// Defers `amount` (settlement currency) to the customer's account.
    ///
    /// ## Behavior
    /// - No customer, or `amount <= 0`: no-op
    /// - Nothing owed: no-op
    /// - More than owed: clamped to the remaining amount
    ///
    /// Returns the amount actually credited, in the base currency.
    pub fn add_to_customer_account(
        &mut self,
        amount: Decimal,
        currencies: &CurrencySet,
    ) -> CoreResult<Decimal> {
        if self.customer.is_none() || amount <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        if self.final_amount(currencies)? <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let outstanding = self.outstanding(currencies)?;
        let accepted = if amount > outstanding {
            tracing::warn!(
                draft_id = %self.id,
                offered = %amount,
                accepted = %outstanding,
                "account credit clamped to remaining amount"
            );
            outstanding
        } else {
            amount
        };
        let in_base = currencies.to_base(accepted, self.settlement_currency_id)?;

        if let Some(customer) = self.customer.as_mut() {
            let current = customer.added_to_account.unwrap_or(Decimal::ZERO);
            customer.added_to_account = Some(current + in_base);
            tracing::debug!(
                draft_id = %self.id,
                customer_id = customer.customer_id,
                amount = %in_base,
                "added to customer account"
            );
        }
        Ok(in_base)
    }

    /// Resets the deferred amount; the customer stays attached.
    pub fn clear_customer_account(&mut self) {
        if let Some(customer) = self.customer.as_mut() {
            customer.added_to_account = None;
        }
    }

    /// Deferred amount expressed in the settlement currency.
    pub fn credit_in_settlement(&self, currencies: &CurrencySet) -> CoreResult<Decimal> {
        match self.customer.as_ref().and_then(|c| c.added_to_account) {
            Some(base) => currencies.from_base(base, self.settlement_currency_id),
            None => Ok(Decimal::ZERO),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::tests::{currencies, draft_with, inventory};
    use crate::payment::NewTender;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn record(added: Option<Decimal>) -> CustomerRecord {
        CustomerRecord {
            id: 11,
            name: "Rowan Ames".into(),
            balance: dec!(120),
            added_to_account: added,
        }
    }

    #[test]
    fn test_no_customer_is_noop() {
        let (mut draft, set) = draft_with(dec!(100));
        assert_eq!(draft.add_to_customer_account(dec!(10), &set).unwrap(), Decimal::ZERO);
        assert_eq!(draft.final_amount(&set).unwrap(), dec!(100));
    }

    #[test]
    fn test_credit_reduces_final_amount() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.attach_customer(&record(None), &set).unwrap();

        assert_eq!(draft.add_to_customer_account(dec!(30), &set).unwrap(), dec!(30));
        assert_eq!(draft.add_to_customer_account(dec!(0), &set).unwrap(), Decimal::ZERO);
        assert_eq!(draft.final_amount(&set).unwrap(), dec!(70));
    }

    #[test]
    fn test_credit_is_stored_in_base_currency() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.set_settlement_currency(2, &set).unwrap();
        draft.attach_customer(&record(None), &set).unwrap();

        // 19 EUR on account is 20 USD
        let credited = draft.add_to_customer_account(dec!(19), &set).unwrap();
        assert_eq!(credited, dec!(20));
        assert_eq!(draft.customer().unwrap().added_to_account, Some(dec!(20)));
        assert_eq!(draft.final_amount(&set).unwrap(), dec!(76));
    }

    #[test]
    fn test_credit_is_clamped_with_payments() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.attach_customer(&record(None), &set).unwrap();
        draft.add_payment(NewTender::new(dec!(80), 1), &set).unwrap();

        assert_eq!(draft.add_to_customer_account(dec!(50), &set).unwrap(), dec!(20));
        assert_eq!(draft.final_amount(&set).unwrap(), Decimal::ZERO);
        assert_eq!(draft.add_to_customer_account(dec!(5), &set).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_attach_reapplies_carried_amount() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.attach_customer(&record(Some(dec!(250))), &set).unwrap();

        let customer = draft.customer().unwrap();
        assert_eq!(customer.customer_id, 11);
        assert_eq!(customer.added_to_account, Some(dec!(100)));
        assert_eq!(draft.final_amount(&set).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_clear_and_detach_leave_payments_alone() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.add_payment(NewTender::new(dec!(40), 1), &set).unwrap();
        draft.attach_customer(&record(None), &set).unwrap();
        draft.add_to_customer_account(dec!(10), &set).unwrap();

        draft.clear_customer_account();
        assert!(draft.customer().unwrap().added_to_account.is_none());
        assert_eq!(draft.final_amount(&set).unwrap(), dec!(60));

        draft.add_to_customer_account(dec!(10), &set).unwrap();
        let detached = draft.detach_customer().unwrap();
        assert_eq!(detached.added_to_account, Some(dec!(10)));
        assert!(draft.customer().is_none());
        assert_eq!(draft.payments().len(), 1);
        assert_eq!(draft.final_amount(&set).unwrap(), dec!(60));
    }

    #[test]
    fn test_switching_customer_keeps_payments() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.add_payment(NewTender::new(dec!(25), 1), &set).unwrap();
        draft.attach_customer(&record(None), &set).unwrap();

        let other = CustomerRecord {
            id: 12,
            name: "Jules Okafor".into(),
            balance: Decimal::ZERO,
            added_to_account: None,
        };
        draft.attach_customer(&other, &set).unwrap();
        assert_eq!(draft.customer().unwrap().customer_id, 12);
        assert_eq!(draft.total_paid(&set).unwrap(), dec!(25));
    }

    #[test]
    fn test_credit_after_settlement_switch_stays_within_total() {
        let (mut draft, set) = draft_with(dec!(100));
        draft.add_payment(NewTender::new(dec!(50), 1), &set).unwrap();
        draft.set_settlement_currency(2, &set).unwrap();
        draft.attach_customer(&record(None), &set).unwrap();

        // 47.50 EUR is still owed; the rest of the offer is clamped
        let credited = draft.add_to_customer_account(dec!(100), &set).unwrap();
        assert_eq!(credited, dec!(50));

        let covered = draft.total_paid(&set).unwrap() + draft.credit_in_settlement(&set).unwrap();
        assert_eq!(covered, draft.total_amount(&set).unwrap());
        assert_eq!(draft.final_amount(&set).unwrap(), Decimal::ZERO);

        draft.set_settlement_currency(1, &set).unwrap();
        assert!(draft.check_settlement(&set).is_ok());
        assert_eq!(draft.final_amount(&set).unwrap(), Decimal::ZERO);
    }

    proptest! {
        /// Tenders, account credit and settlement currency switches in any
        /// order never push what is covered above the total.
        #[test]
        fn credit_and_tenders_never_exceed_total(
            price_cents in 1i64..1_000_000,
            steps in prop::collection::vec((0u8..3, 1i64..500_000, 1i64..=3), 1..16),
        ) {
            let set = currencies();
            let mut draft = SaleDraft::new(1);
            draft.add_inventory_item(&inventory(1, Decimal::new(price_cents, 2)), &set).unwrap();
            draft.attach_customer(&record(None), &set).unwrap();

            let mut previous = draft.final_amount(&set).unwrap();
            for (kind, cents, currency) in steps {
                let amount = Decimal::new(cents, 2);
                match kind {
                    0 => { let _ = draft.add_payment(NewTender::new(amount, currency), &set); }
                    1 => { draft.add_to_customer_account(amount, &set).unwrap(); }
                    _ => { let _ = draft.set_settlement_currency(currency, &set); }
                }

                prop_assert_eq!(draft.overpayment(&set).unwrap(), Decimal::ZERO);
                prop_assert!(draft.check_settlement(&set).is_ok());

                let remaining = draft.final_amount(&set).unwrap();
                prop_assert!(remaining >= Decimal::ZERO);
                if kind < 2 {
                    prop_assert!(remaining <= previous);
                }
                previous = remaining;
            }
        }
    }
}
