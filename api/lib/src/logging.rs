// Copyright (C) Microsoft Corporation. All rights reserved.

use std::fs::File;
use std::io;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::ShimConfig;
use crate::ShimError;
use crate::ShimResult;

/// Installs the process-wide `tracing` subscriber.
///
/// Levels come from `RUST_LOG`. Sinks come from `config`: pretty output on
/// stderr and compact output to a file, either or both. Fails with
/// [`ShimError::Logging`] when the file cannot be created or a global
/// subscriber is already installed.
pub fn init_logging(config: &ShimConfig) -> ShimResult<()> {
    let mut layers = Vec::new();

    if config.log_stderr {
        let layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_thread_names(true)
            .with_target(true)
            .with_writer(io::stderr)
            .boxed();
        layers.push(layer);
    }

    if let Some(path) = &config.log_file {
        let file = File::create(path)
            .map_err(|e| ShimError::Logging(format!("{}: {e}", path.display())))?;
        let layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(false)
            .with_thread_names(true)
            .with_target(true)
            .with_writer(file)
            .boxed();
        layers.push(layer);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(layers)
        .try_init()
        .map_err(|e| ShimError::Logging(e.to_string()))?;

    tracing::info!("hostshim: logging started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;

    #[test]
    fn test_second_subscriber_is_an_error() {
        // The test harness subscriber is already global.
        let config = ShimConfig {
            log_stderr: true,
            ..ShimConfig::default()
        };
        assert!(matches!(init_logging(&config), Err(ShimError::Logging(_))));
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = ShimConfig {
            log_file: Some(dir.path().join("missing").join("shim.log")),
            ..ShimConfig::default()
        };

        let err = init_logging(&config).expect_err("log file in a missing directory");
        match err {
            ShimError::Logging(message) => assert!(message.contains("shim.log"), "{message}"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
