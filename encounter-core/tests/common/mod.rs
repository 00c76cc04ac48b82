//! Shared setup for the integration tests.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Load `.env` and route engine logs to the test output.
///
/// `RUST_LOG=encounter_core=debug cargo test -- --nocapture` shows every turn.
pub fn setup() {
    INIT.call_once(|| {
        let _ = dotenvy::dotenv();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
