//! Subscriber setup for test runs
//!
//! The library only emits `tracing` events. Call [`init`] once from a test
//! harness or binary to print them; `RUST_LOG` overrides the default filter.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "sharepo=info";

/// Install a fmt subscriber writing to the test writer.
///
/// Safe to call more than once; later calls are no-ops. Returns `true` when
/// this call installed the subscriber.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_test_writer()
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _ = init();
        assert!(!init());
        tracing::info!("subscriber ready");
    }
}
