use std::io;
use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable enabling log output in tests.
pub const ENABLE_TRACING_ENV: &str = "ENABLE_TRACING";

static INIT_TEST_TRACING: Once = Once::new();

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Installs the global tracing subscriber for `app_name`.
///
/// Logs go to stderr so that stdout only carries program output. The filter is read from
/// `RUST_LOG` and defaults to `info` for every target.
pub fn init_tracing(app_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt::layer().with_writer(io::stderr))
        .try_init()?;

    tracing::debug!(app_name, "tracing initialized");

    Ok(())
}

/// Installs a tracing subscriber for tests, once per process.
///
/// Nothing is installed unless [`ENABLE_TRACING_ENV`] is set, which keeps test output quiet by
/// default.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var_os(ENABLE_TRACING_ENV).is_none() {
            return;
        }

        let _ = tracing_subscriber::registry()
            .with(env_filter("debug"))
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_can_be_initialized_many_times() {
        init_test_tracing();
        init_test_tracing();
    }
}
