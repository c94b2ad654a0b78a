//! # Settlement Payload
//!
//! Wire format of a finished sale and of the backend's answer.
//!
//! ## Request Shape
//! ```text
//! POST /sales/
//! {
//!   "receiptId": "5b0e…",          draft id (retry-safe)
//!   "saleDate": "2024-05-01T…Z",   draft date or submission time
//!   "customer": 11 | null,
//!   "discountAmount": 10.0,        settlement currency
//!   "taxAmount": 0.0,
//!   "currency": 1,                 settlement currency id
//!   "notes": "",
//!   "items":    [{ "inventory", "quantity", "unitPrice", "discountAmount" }],
//!   "payments": [{ "amount", "currency", "cashDrawer" }],
//!   "customerAddedToAccount": 20.0 (base currency, omitted when none)
//! }
//! ```
//! Amounts go out as JSON numbers; responses accept numbers or strings.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::currency::CurrencySet;
use crate::draft::SaleDraft;
use crate::error::CoreResult;
use crate::money::CurrencyId;

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleRequest {
    pub receipt_id: String,

    /// RFC 3339, UTC.
    pub sale_date: String,

    pub customer: Option<i64>,

    #[serde(with = "rust_decimal::serde::float")]
    #[ts(type = "number")]
    pub discount_amount: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    #[ts(type = "number")]
    pub tax_amount: Decimal,

    pub currency: CurrencyId,

    pub notes: String,

    pub items: Vec<SaleRequestItem>,

    pub payments: Vec<SaleRequestPayment>,

    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[ts(type = "number | null")]
    pub customer_added_to_account: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleRequestItem {
    /// Inventory record id.
    pub inventory: i64,

    #[serde(with = "rust_decimal::serde::float")]
    #[ts(type = "number")]
    pub quantity: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    #[ts(type = "number")]
    pub unit_price: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    #[ts(type = "number")]
    pub discount_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleRequestPayment {
    #[serde(with = "rust_decimal::serde::float")]
    #[ts(type = "number")]
    pub amount: Decimal,

    pub currency: CurrencyId,

    pub cash_drawer: Option<i64>,
}

// =============================================================================
// Response
// =============================================================================

/// The sale record the backend created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleReceipt {
    pub id: i64,

    pub receipt_id: String,

    #[serde(default)]
    pub sale_date: Option<String>,

    #[serde(default)]
    #[ts(type = "string | null")]
    pub total_amount: Option<Decimal>,

    #[serde(default)]
    pub currency: Option<CurrencyId>,
}

// =============================================================================
// Assembly
// =============================================================================

impl SaleDraft {
    /// Builds the submission payload.
    ///
    /// `now` stamps the sale when no explicit sale date was set. Line prices
    /// and discounts are converted into the settlement currency; tenders
    /// keep their own currency.
    pub fn to_sale_request(
        &self,
        currencies: &CurrencySet,
        now: DateTime<Utc>,
    ) -> CoreResult<SaleRequest> {
        let currency = self.settlement_currency_id;

        let items = self
            .items
            .iter()
            .map(|line| {
                Ok(SaleRequestItem {
                    inventory: line.inventory_reference_id,
                    quantity: line.quantity,
                    unit_price: currencies.convert(
                        line.selling_price,
                        line.selling_currency_id,
                        currency,
                    )?,
                    discount_amount: currencies.convert(
                        line.discount_price,
                        line.discount_currency_id,
                        currency,
                    )?,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let payments = self
            .payments
            .iter()
            .map(|p| SaleRequestPayment {
                amount: p.amount,
                currency: p.currency_id,
                cash_drawer: p.cash_drawer_id,
            })
            .collect();

        let customer_added_to_account = self
            .customer
            .as_ref()
            .and_then(|c| c.added_to_account)
            .filter(|amount| !amount.is_zero());

        Ok(SaleRequest {
            receipt_id: self.id.clone(),
            sale_date: self
                .sale_date
                .unwrap_or(now)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            customer: self.customer.as_ref().map(|c| c.customer_id),
            discount_amount: self.discount_amount,
            tax_amount: Decimal::ZERO,
            currency,
            notes: self.notes.clone(),
            items,
            payments,
            customer_added_to_account,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
