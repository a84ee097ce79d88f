// Copyright (C) Microsoft Corporation. All rights reserved.

use std::panic::catch_unwind;
use std::panic::UnwindSafe;
use std::process::abort;

/// Logs an engine error with its source location, appending whatever
/// libcrypto left on the calling thread's error queue.
#[macro_export]
macro_rules! engine_log {
    ($lib:expr, $error:expr, $level:expr, $($arg:tt)*) => {
        let file = file!();
        let line = line!();
        let queue = $crate::library::Libcrypto::drain_errors($lib);
        let log_string = if queue.is_empty() {
            format!("{}: {}", $error, format!($($arg)*))
        } else {
            format!("{}: {} [{}]", $error, format!($($arg)*), queue.join("; "))
        };

        match $level {
            ::tracing::Level::TRACE => ::tracing::trace!("{file}:{line}: {log_string}"),
            ::tracing::Level::DEBUG => ::tracing::debug!("{file}:{line}: {log_string}"),
            ::tracing::Level::INFO => ::tracing::info!("{file}:{line}: {log_string}"),
            ::tracing::Level::WARN => ::tracing::warn!("{file}:{line}: {log_string}"),
            _ => ::tracing::error!("{file}:{line}: {log_string}"),
        }
    };
}

/// Crypto layer error type
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Algorithm name is not one of the recognized digests
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// libcrypto is not loaded, or could not provide a digest session
    #[error("Crypto engine unavailable")]
    EngineUnavailable,

    /// libcrypto reported failure during a digest operation
    #[error("Crypto engine failure")]
    EngineFailure,

    /// No candidate libcrypto could be opened
    #[error("Could not load libcrypto: {0}")]
    LibraryLoad(String),

    /// A required libcrypto symbol is missing
    #[error("libcrypto symbol not found: {0}")]
    MissingSymbol(String),

    /// The lock table could not be allocated
    #[error("Could not allocate lock table of {0} locks")]
    LockTableAllocation(usize),

    /// Dynamic lock handle is not in the table
    #[error("Invalid dynamic lock handle {0}")]
    InvalidLockHandle(usize),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Catch an unwinding and abort
pub fn on_unwind_abort<F: FnOnce() -> R + UnwindSafe, R>(func: F) -> R {
    let ret = catch_unwind(func);
    match ret {
        Ok(v) => v,
        Err(_) => {
            // We only get here after a panic, not if the result of func was Ok or Err.
            // Unwinding into libcrypto is undefined behavior, so abort instead.
            abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;

    #[test]
    fn test_on_unwind_abort_passes_value_through() {
        let value = on_unwind_abort(|| 7);
        assert_eq!(value, 7);

        let result: CryptoResult<()> = on_unwind_abort(|| Err(CryptoError::EngineFailure));
        assert_eq!(result, Err(CryptoError::EngineFailure));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CryptoError::UnsupportedAlgorithm("md5".to_string()).to_string(),
            "Unsupported digest algorithm: md5"
        );
        assert_eq!(
            CryptoError::LockTableAllocation(41).to_string(),
            "Could not allocate lock table of 41 locks"
        );
    }
}
