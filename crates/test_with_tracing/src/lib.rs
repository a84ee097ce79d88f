// Copyright (C) Microsoft Corporation. All rights reserved.

//! `#[test]` with `tracing` output routed to the test harness.
//!
//! ```ignore
//! use test_with_tracing::test;
//!
//! #[test]
//! fn digest_matches() {
//!     tracing::debug!("visible with --nocapture or on failure");
//! }
//! ```

#[cfg(test)]
extern crate self as test_with_tracing;

use std::sync::Once;

pub use test_with_tracing_macro::test;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset or unparsable.
const DEFAULT_TEST_FILTER: &str = "debug";

#[doc(hidden)]
/// Installs the global test subscriber. Every call after the first is a
/// no-op, so each test can call it unconditionally.
pub fn init() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|e| {
            if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
                eprintln!("test_with_tracing: ignoring RUST_LOG: {e}");
            }
            EnvFilter::new(DEFAULT_TEST_FILTER)
        });

        let layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(false)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer();

        // Another global subscriber wins; tests still run without ours.
        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
        {
            eprintln!("test_with_tracing: subscriber not installed: {e}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::test;

    #[test]
    fn test_tracing_and_log_output() {
        tracing::info!("tracing event reaches the harness");
        log::info!("log record reaches the harness");
    }

    #[test]
    fn test_with_result() -> Result<(), Box<dyn std::error::Error>> {
        let width: u16 = "80".parse()?;
        tracing::debug!(width);
        Ok(())
    }

    #[test]
    fn test_init_is_repeatable() {
        super::init();
        super::init();
        assert!(tracing::dispatcher::has_been_set());
    }
}
