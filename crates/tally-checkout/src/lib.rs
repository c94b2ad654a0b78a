//! # tally-checkout: Register Session & Sale Submission
//!
//! Owns the live [`CartSession`] and gets finished sales to the backend.
//!
//! ## Module Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        tally-checkout Modules                           │
//! │                                                                         │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────┐  ┌─────────────┐   │
//! │  │ session     │  │ coordinator  │  │ client      │  │ config      │   │
//! │  │             │  │              │  │             │  │             │   │
//! │  │ CartSession │◄─│ confirm_     │─►│ SaleRecorder│  │ TOML + env  │   │
//! │  │ state enum  │  │ submit()     │  │ BackendClient│ │ validation  │   │
//! │  └─────────────┘  └──────────────┘  └─────────────┘  └─────────────┘   │
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐                                      │
//! │  │ error       │  │ logging     │                                      │
//! │  │ Checkout-   │  │ init_       │                                      │
//! │  │ Error       │  │ tracing()   │                                      │
//! │  └─────────────┘  └─────────────┘                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally_checkout::{BackendClient, CartSession, CheckoutConfig, SubmissionCoordinator};
//!
//! tally_checkout::init_tracing();
//! let config = CheckoutConfig::load_or_default(None);
//! let client = Arc::new(BackendClient::new(&config)?);
//!
//! let session = CartSession::bootstrap(client.as_ref(), &config).await?;
//! let coordinator = SubmissionCoordinator::new(session, client);
//!
//! coordinator.with_session_mut(|s| s.add_inventory_item(&item))?;
//! let receipt = coordinator.confirm_submit().await?;
//! ```

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod session;

pub use client::{BackendClient, CurrencyDirectory, CustomerDirectory, SaleRecorder};
pub use config::{BackendSettings, CheckoutConfig, RegisterSettings};
pub use coordinator::SubmissionCoordinator;
pub use error::{CheckoutError, CheckoutResult};
pub use logging::init_tracing;
pub use session::{CartSession, PendingSubmission, SubmissionState};
