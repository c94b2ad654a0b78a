//! # Cart Session
//!
//! The explicitly owned register session: the current draft, the loaded
//! currency directory and the submission state. Every cashier action goes
//! through a method here; nothing else holds a mutable draft.
//!
//! ## Submission State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            begin_submit()                 finish_submit(Ok)             │
//! │   ┌──────┐ ─────────────► ┌────────────┐ ────────────────► ┌─────────┐ │
//! │   │ Idle │                │ Submitting │                   │ Settled │ │
//! │   └──────┘ ◄───────────── └────────────┘ ───────┐          └────┬────┘ │
//! │      ▲      (rejected:          │               │ finish(Err)   │      │
//! │      │       empty / owed)      │ any mutation  ▼               │      │
//! │      │                          │ or submit  ┌────────┐         │      │
//! │      │                          ▼            │ Failed │         │      │
//! │      │                 SubmissionInProgress  └───┬────┘         │      │
//! │      │                                           │              │      │
//! │      └───────────── next mutation or submit ─────┴──────────────┘      │
//! │                                                                         │
//! │  Settled: draft replaced by an empty successor (new id)                 │
//! │  Failed:  draft left exactly as it was, ready for retry                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::{
    CartTotals, CoreError, CoreResult, CurrencyField, CurrencyId, CurrencySet, CustomerAccount,
    CustomerRecord, EditOutcome, FieldEdit, InventoryItem, NewTender, SaleDraft, SaleReceipt,
    SaleRequest, Tender,
};
use tracing::{debug, error, info, warn};

use crate::client::CurrencyDirectory;
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Submission State
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SubmissionState {
    Idle,
    Submitting,
    #[serde(rename_all = "camelCase")]
    Settled {
        receipt_id: String,
    },
    Failed {
        message: String,
    },
}

/// A submission that passed its preconditions and is waiting on the backend.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub draft_id: String,
    pub request: SaleRequest,
}

// =============================================================================
// Cart Session
// =============================================================================

#[derive(Debug)]
pub struct CartSession {
    currencies: CurrencySet,
    draft: SaleDraft,
    state: SubmissionState,
    default_cash_drawer: Option<i64>,
}

impl CartSession {
    /// Opens a session with an empty draft settled in `settlement_currency_id`.
    pub fn new(currencies: CurrencySet, settlement_currency_id: CurrencyId) -> CheckoutResult<Self> {
        currencies.require(settlement_currency_id)?;
        Ok(CartSession {
            currencies,
            draft: SaleDraft::new(settlement_currency_id),
            state: SubmissionState::Idle,
            default_cash_drawer: None,
        })
    }

    /// Opens a session using the register settings from `config`.
    ///
    /// The configured settlement currency code must exist in the directory;
    /// without one the base currency is used.
    pub fn from_config(currencies: CurrencySet, config: &CheckoutConfig) -> CheckoutResult<Self> {
        let settlement = match config.register.settlement_currency.as_deref() {
            Some(code) => currencies
                .by_code(code)
                .map(|c| c.id)
                .ok_or_else(|| {
                    CheckoutError::InvalidConfig(format!(
                        "settlement currency {} is not in the currency directory",
                        code
                    ))
                })?,
            None => currencies.base().id,
        };

        let mut session = CartSession::new(currencies, settlement)?;
        session.default_cash_drawer = config.register.cash_drawer_id;
        Ok(session)
    }

    /// Fetches the currency directory and opens a session on it.
    pub async fn bootstrap(
        directory: &dyn CurrencyDirectory,
        config: &CheckoutConfig,
    ) -> CheckoutResult<Self> {
        let currencies = CurrencySet::new(directory.load_currencies().await?)?;
        info!(count = currencies.len(), "register session ready");
        CartSession::from_config(currencies, config)
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn draft(&self) -> &SaleDraft {
        &self.draft
    }

    pub fn currencies(&self) -> &CurrencySet {
        &self.currencies
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn totals(&self) -> CheckoutResult<CartTotals> {
        Ok(self.draft.totals(&self.currencies)?)
    }

    pub fn final_amount(&self) -> CheckoutResult<Decimal> {
        Ok(self.draft.final_amount(&self.currencies)?)
    }

    /// Amount formatted with the currency's precision, for display.
    pub fn format_price(&self, amount: Decimal, currency_id: CurrencyId) -> CheckoutResult<String> {
        Ok(self.currencies.format_price(amount, currency_id)?)
    }

    /// Input step for a currency (0.01 for two-decimal currencies).
    pub fn decimal_step(&self, currency_id: CurrencyId) -> CheckoutResult<Decimal> {
        Ok(self.currencies.decimal_step(currency_id)?)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Runs one draft mutation under the submission guard.
    fn mutate<R>(
        &mut self,
        action: impl FnOnce(&mut SaleDraft, &CurrencySet) -> CoreResult<R>,
    ) -> CheckoutResult<R> {
        self.enter_idle()?;
        Ok(action(&mut self.draft, &self.currencies)?)
    }

    pub fn add_inventory_item(&mut self, item: &InventoryItem) -> CheckoutResult<EditOutcome> {
        self.mutate(|draft, currencies| draft.add_inventory_item(item, currencies))
    }

    pub fn remove_item(&mut self, line_id: &str) -> CheckoutResult<()> {
        self.mutate(|draft, currencies| draft.remove_item(line_id, currencies))
    }

    pub fn edit_item(&mut self, line_id: &str, edit: FieldEdit) -> CheckoutResult<EditOutcome> {
        self.mutate(|draft, currencies| draft.edit_item(line_id, edit, currencies))
    }

    pub fn relabel_item_currency(
        &mut self,
        line_id: &str,
        field: CurrencyField,
        currency_id: CurrencyId,
    ) -> CheckoutResult<()> {
        self.mutate(|draft, currencies| {
            draft.relabel_item_currency(line_id, field, currency_id, currencies)
        })
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> CheckoutResult<()> {
        let notes = notes.into();
        self.mutate(|draft, _| draft.set_notes(notes))
    }

    pub fn set_discount_amount(&mut self, amount: Decimal) -> CheckoutResult<()> {
        self.mutate(|draft, currencies| draft.set_discount_amount(amount, currencies))
    }

    pub fn set_sale_date(&mut self, sale_date: Option<DateTime<Utc>>) -> CheckoutResult<()> {
        self.mutate(|draft, _| {
            draft.set_sale_date(sale_date);
            Ok(())
        })
    }

    pub fn set_settlement_currency(&mut self, currency_id: CurrencyId) -> CheckoutResult<()> {
        self.mutate(|draft, currencies| draft.set_settlement_currency(currency_id, currencies))
    }

    /// Adds a tender; the register's default drawer is used when none is given.
    pub fn add_payment(&mut self, mut tender: NewTender) -> CheckoutResult<Tender> {
        if tender.cash_drawer_id.is_none() {
            tender.cash_drawer_id = self.default_cash_drawer;
        }
        self.mutate(|draft, currencies| draft.add_payment(tender, currencies))
    }

    pub fn delete_payment(&mut self, payment_id: &str) -> CheckoutResult<Tender> {
        self.mutate(|draft, _| draft.delete_payment(payment_id))
    }

    pub fn attach_customer(&mut self, record: &CustomerRecord) -> CheckoutResult<()> {
        self.mutate(|draft, currencies| draft.attach_customer(record, currencies))
    }

    pub fn detach_customer(&mut self) -> CheckoutResult<Option<CustomerAccount>> {
        self.mutate(|draft, _| Ok(draft.detach_customer()))
    }

    pub fn add_to_customer_account(&mut self, amount: Decimal) -> CheckoutResult<Decimal> {
        self.mutate(|draft, currencies| draft.add_to_customer_account(amount, currencies))
    }

    pub fn clear_customer_account(&mut self) -> CheckoutResult<()> {
        self.mutate(|draft, _| {
            draft.clear_customer_account();
            Ok(())
        })
    }

    /// Swaps in a freshly loaded currency directory.
    ///
    /// Refused, keeping the current directory, when the draft's settlement
    /// currency is missing from it or when recorded tenders would be worth
    /// more than the sale at the new rates.
    pub fn replace_currencies(&mut self, currencies: CurrencySet) -> CheckoutResult<()> {
        self.enter_idle()?;
        currencies.require(self.draft.settlement_currency_id())?;
        if let Err(err) = self.draft.check_settlement(&currencies) {
            warn!(draft_id = %self.draft.id(), error = %err, "new exchange rates refused");
            return Err(err.into());
        }
        self.currencies = currencies;
        Ok(())
    }

    /// Abandons the current draft for an empty one.
    ///
    /// Allowed while a submission is in flight: the pending response will
    /// then belong to a retired draft and is not applied to the new one.
    pub fn clear(&mut self) {
        if self.state == SubmissionState::Submitting {
            warn!(draft_id = %self.draft.id(), "draft cleared while its submission is in flight");
        }
        self.draft.clear();
        self.state = SubmissionState::Idle;
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Checks preconditions and moves to `Submitting`.
    ///
    /// ## Returns
    /// - `Err(SubmissionInProgress)` while another submission is pending
    /// - `Err(EmptyCart)` with no lines
    /// - `Err(SettlementIncomplete)` while something is owed
    /// - `Err(PaymentsExceedTotal)` when tenders and credit overshoot the total
    /// - `Ok(PendingSubmission)` carrying the payload to send
    pub fn begin_submit(&mut self, now: DateTime<Utc>) -> CheckoutResult<PendingSubmission> {
        self.enter_idle()?;

        if self.draft.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let owed = self.draft.final_amount(&self.currencies)?;
        if owed < Decimal::ZERO {
            return Err(CoreError::PaymentsExceedTotal { excess: -owed }.into());
        }
        if !owed.is_zero() {
            let currency_id = self.draft.settlement_currency_id();
            let code = &self.currencies.require(currency_id)?.code;
            let outstanding = format!("{} {}", self.currencies.format_price(owed, currency_id)?, code);
            debug!(draft_id = %self.draft.id(), %outstanding, "submit refused");
            return Err(CheckoutError::SettlementIncomplete {
                outstanding,
                amount: owed,
            });
        }

        let request = self.draft.to_sale_request(&self.currencies, now)?;
        let draft_id = self.draft.id().to_string();

        self.state = SubmissionState::Submitting;
        info!(draft_id = %draft_id, items = request.items.len(), "submitting sale");

        Ok(PendingSubmission { draft_id, request })
    }

    /// Applies the backend's answer to the session.
    ///
    /// A response for a draft that was cleared meanwhile never touches the
    /// replacement draft.
    pub fn finish_submit(
        &mut self,
        pending: PendingSubmission,
        result: CheckoutResult<SaleReceipt>,
    ) -> CheckoutResult<SaleReceipt> {
        let current = self.draft.id() == pending.draft_id;

        match result {
            Ok(receipt) if current => {
                info!(
                    draft_id = %pending.draft_id,
                    receipt_id = %receipt.receipt_id,
                    sale_id = receipt.id,
                    "sale settled"
                );
                self.state = SubmissionState::Settled {
                    receipt_id: receipt.receipt_id.clone(),
                };
                self.draft = self.draft.successor();
                Ok(receipt)
            }
            Ok(receipt) => {
                warn!(
                    draft_id = %pending.draft_id,
                    sale_id = receipt.id,
                    "sale recorded for a retired draft"
                );
                Ok(receipt)
            }
            Err(err) if current => {
                error!(draft_id = %pending.draft_id, error = %err, "sale submission failed");
                self.state = SubmissionState::Failed {
                    message: err.user_message(),
                };
                Err(err)
            }
            Err(err) => {
                warn!(draft_id = %pending.draft_id, error = %err, "submission for a retired draft failed");
                Err(err)
            }
        }
    }

    /// Rejects while submitting; otherwise settles any terminal state to Idle.
    fn enter_idle(&mut self) -> CheckoutResult<()> {
        match self.state {
            SubmissionState::Submitting => Err(CheckoutError::SubmissionInProgress),
            SubmissionState::Idle => Ok(()),
            SubmissionState::Settled { .. } | SubmissionState::Failed { .. } => {
                self.state = SubmissionState::Idle;
                Ok(())
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
