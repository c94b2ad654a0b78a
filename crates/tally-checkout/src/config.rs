//! # Checkout Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_BACKEND_URL=https://pos.example.com/api                      │
//! │     TALLY_API_TOKEN=...                                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally-pos/checkout.toml (Linux)                          │
//! │     ~/Library/Application Support/com.tally.pos/checkout.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     http://localhost:8000/api, 15s timeout                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # checkout.toml
//! [backend]
//! base_url = "https://pos.example.com/api"
//! timeout_secs = 15
//! api_token = "..."
//!
//! [register]
//! cash_drawer_id = 1
//! settlement_currency = "USD"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Backend Settings
// =============================================================================

/// Where the sales backend lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// REST root; `/sales/`, `/currencies/` and `/customers/` hang off it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Sent as `Authorization: Token <token>` when present.
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> u64 {
    15
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            api_token: None,
        }
    }
}

// =============================================================================
// Register Settings
// =============================================================================

/// Per-register defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterSettings {
    /// Drawer stamped on cash tenders that don't name one.
    #[serde(default)]
    pub cash_drawer_id: Option<i64>,

    /// Currency code new drafts settle in; the base currency when unset.
    #[serde(default)]
    pub settlement_currency: Option<String>,
}

// =============================================================================
// Checkout Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub register: RegisterSettings,
}

impl CheckoutConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (checkout.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CheckoutResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> CheckoutResult<()> {
        let url = &self.backend.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CheckoutError::InvalidConfig(format!(
                "Backend URL must start with http:// or https://, got: {}",
                url
            )));
        }

        if self.backend.timeout_secs == 0 {
            return Err(CheckoutError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TALLY_BACKEND_URL") {
            debug!(url = %url, "Overriding backend URL from environment");
            self.backend.base_url = url;
        }

        if let Some(timeout) = lookup("TALLY_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.backend.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric TALLY_TIMEOUT_SECS"),
            }
        }

        if let Some(token) = lookup("TALLY_API_TOKEN") {
            self.backend.api_token = Some(token);
        }

        if let Some(drawer) = lookup("TALLY_CASH_DRAWER_ID") {
            if let Ok(id) = drawer.parse::<i64>() {
                self.register.cash_drawer_id = Some(id);
            }
        }

        if let Some(code) = lookup("TALLY_SETTLEMENT_CURRENCY") {
            self.register.settlement_currency = Some(code);
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Backend root without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.backend.base_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }
}
