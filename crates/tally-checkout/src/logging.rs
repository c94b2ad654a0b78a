//! # Logging Bootstrap
//!
//! ## Log Levels
//! Set via the `RUST_LOG` environment variable:
//! - `RUST_LOG=debug` - Show debug messages everywhere
//! - `RUST_LOG=tally_core=trace` - Trace the pricing engine only
//! - Default: INFO, with DEBUG for the tally crates

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset (`tally` prefixes both crates).
pub const DEFAULT_FILTER: &str = "info,tally=debug";

/// Installs the global fmt subscriber.
///
/// Returns `false` when a subscriber was already installed (e.g. by the
/// host application or a previous call).
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init_tracing();
        assert!(!init_tracing());
    }
}
