//! # Backend Client
//!
//! The collaborators the checkout engine talks to, and an HTTP
//! implementation of all three against the POS REST backend.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Trait               Method                  HTTP                       │
//! │  ─────               ──────                  ────                       │
//! │  SaleRecorder        record_sale(request)    POST {base}/sales/         │
//! │  CurrencyDirectory   load_currencies()       GET  {base}/currencies/    │
//! │  CustomerDirectory   search_customers(kw)    GET  {base}/customers/     │
//! │                                                   ?search=<kw>          │
//! │                                                                         │
//! │  non-2xx  ──► CheckoutError::Http { status, message }   (retryable)     │
//! │  transport ─► CheckoutError::Network                    (retryable)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tally_core::{Currency, CustomerRecord, SaleReceipt, SaleRequest};
use tracing::{debug, error};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Accepts a finished sale and returns the server-side record.
#[async_trait]
pub trait SaleRecorder: Send + Sync {
    async fn record_sale(&self, request: &SaleRequest) -> CheckoutResult<SaleReceipt>;
}

/// Source of the currency directory snapshot.
#[async_trait]
pub trait CurrencyDirectory: Send + Sync {
    async fn load_currencies(&self) -> CheckoutResult<Vec<Currency>>;
}

/// Keyword search over customer records.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn search_customers(&self, keyword: &str) -> CheckoutResult<Vec<CustomerRecord>>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// REST client for the POS backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

/// List endpoints answer with a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Plain(items) | ListBody::Paged { results: items } => items,
        }
    }
}

impl BackendClient {
    /// Builds a client from validated configuration.
    pub fn new(config: &CheckoutConfig) -> CheckoutResult<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.backend.api_token {
            let value = HeaderValue::from_str(&format!("Token {}", token))
                .map_err(|e| CheckoutError::InvalidConfig(format!("api_token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| CheckoutError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(BackendClient {
            http,
            base_url: config.base_url().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turns a non-success response into `CheckoutError::Http`.
    async fn check(response: Response) -> CheckoutResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(CheckoutError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> CheckoutResult<Vec<T>> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        let body: ListBody<T> = Self::check(response).await?.json().await?;
        Ok(body.into_vec())
    }
}

#[async_trait]
impl SaleRecorder for BackendClient {
    async fn record_sale(&self, request: &SaleRequest) -> CheckoutResult<SaleReceipt> {
        debug!(receipt_id = %request.receipt_id, items = request.items.len(), "POST sales");

        let result = async {
            let response = self.http.post(self.url("sales/")).json(request).send().await?;
            let receipt: SaleReceipt = Self::check(response).await?.json().await?;
            Ok::<_, CheckoutError>(receipt)
        }
        .await;

        if let Err(err) = &result {
            error!(receipt_id = %request.receipt_id, error = %err, "sale recording failed");
        }
        result
    }
}

#[async_trait]
impl CurrencyDirectory for BackendClient {
    async fn load_currencies(&self) -> CheckoutResult<Vec<Currency>> {
        let currencies: Vec<Currency> = self.get_list("currencies/", &[]).await?;
        debug!(count = currencies.len(), "currency directory fetched");
        Ok(currencies)
    }
}

#[async_trait]
impl CustomerDirectory for BackendClient {
    async fn search_customers(&self, keyword: &str) -> CheckoutResult<Vec<CustomerRecord>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        self.get_list("customers/", &[("search", keyword)]).await
    }
}
