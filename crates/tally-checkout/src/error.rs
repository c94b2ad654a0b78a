//! # Checkout Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Submission     │  │   Backend       │  │   Configuration         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  EmptyCart      │  │  Network  (↻)   │  │  InvalidConfig          │ │
//! │  │  Settlement-    │  │  Http     (↻)   │  │  ConfigLoad             │ │
//! │  │   Incomplete    │  │  Decode         │  │                         │ │
//! │  │  InProgress     │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Core(CoreError) wraps every pricing / ledger rejection.                │
//! │  (↻) = retryable; the draft is kept intact for the retry.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use tally_core::CoreError;
use thiserror::Error;

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[derive(Debug, Error)]
pub enum CheckoutError {
    // =========================================================================
    // Submission Guards
    // =========================================================================
    /// Submit attempted with no lines in the cart.
    #[error("Cannot submit an empty cart")]
    EmptyCart,

    /// Submit attempted while something is still owed.
    #[error("Sale is not settled: {outstanding} still owed")]
    SettlementIncomplete {
        /// Formatted in the settlement currency ("40.00 USD").
        outstanding: String,
        amount: Decimal,
    },

    /// A submission is already in flight.
    #[error("A sale submission is already in progress")]
    SubmissionInProgress,

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// Transport failure (DNS, connect, timeout, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status.
    #[error("Backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Backend answered 2xx with a body we could not read.
    #[error("Unexpected backend response: {0}")]
    Decode(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid checkout configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoad(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for CheckoutError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return CheckoutError::Decode(err.to_string());
        }
        match err.status() {
            Some(status) => CheckoutError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => CheckoutError::Network(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CheckoutError {
    fn from(err: std::io::Error) -> Self {
        CheckoutError::ConfigLoad(err.to_string())
    }
}

impl From<toml::de::Error> for CheckoutError {
    fn from(err: toml::de::Error) -> Self {
        CheckoutError::ConfigLoad(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl CheckoutError {
    /// Returns true if the same submission may simply be tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::Network(_) | CheckoutError::Http { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::InvalidConfig(_) | CheckoutError::ConfigLoad(_)
        )
    }

    /// Short text for the cashier.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::EmptyCart => "Add at least one item before completing the sale.".into(),
            CheckoutError::SettlementIncomplete { outstanding, .. } => {
                format!("{} is still owed.", outstanding)
            }
            CheckoutError::SubmissionInProgress => "The sale is being submitted, please wait.".into(),
            CheckoutError::Network(_) | CheckoutError::Http { .. } | CheckoutError::Decode(_) => {
                "Could not record the sale. Check the connection and try again.".into()
            }
            CheckoutError::InvalidConfig(_) | CheckoutError::ConfigLoad(_) => {
                "Register is misconfigured. Contact your administrator.".into()
            }
            CheckoutError::Core(err) => err.to_string(),
        }
    }
}
