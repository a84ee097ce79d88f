// Copyright (C) Microsoft Corporation. All rights reserved.

use hostshim_os::OsError;
use hostshim_ossl::CryptoError;
use thiserror::Error;

/// Shim Error
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum ShimError {
    /// Digest or crypto bootstrap failure
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// OS call failure
    #[error("os: {0}")]
    Os(#[from] OsError),

    /// Malformed configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Log sink could not be set up
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Shim Result
pub type ShimResult<T> = Result<T, ShimError>;
