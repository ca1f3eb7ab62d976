// ABOUTME: Test support utilities.
// ABOUTME: Provides an in-memory runtime with scriptable failures and subscription counting.

#![allow(dead_code)]

pub mod mock_runtime;

pub use mock_runtime::{LogTail, MockRuntime};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("nocli=debug".parse().expect("valid directive"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}
