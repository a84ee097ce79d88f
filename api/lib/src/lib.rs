// Copyright (C) Microsoft Corporation. All rights reserved.

#![warn(missing_docs)]

//! Native services for a managed host runtime
//!
//! [`Shim`] bundles the operations the host's standard library does not
//! offer portably: file modification times, SHA-1/SHA-256 digests through
//! the system libcrypto, the crypto library's thread-safety bootstrap, and
//! OS queries (identity, terminal width, Windows special folders and
//! registry values).

mod config;
mod error;
mod logging;

use std::path::Path;
use std::path::PathBuf;

pub use config::*;
pub use error::*;
pub use hostshim_os::OsError;
pub use hostshim_os::OsIdentity;
pub use hostshim_os::RegistryView;
pub use hostshim_os::SpecialFolder;
pub use hostshim_ossl::CryptoError;
pub use hostshim_ossl::DigestAlgo;
pub use hostshim_ossl::DigestContext;
pub use hostshim_ossl::ThreadSafety;
pub use logging::init_logging;

/// Binds libcrypto for the process, trying `path` before the default names.
///
/// Never fails: without a usable libcrypto the shim runs in degraded mode
/// where digest operations report [`CryptoError::EngineUnavailable`].
/// Only the first call has any effect.
pub fn bootstrap_crypto(path: Option<&Path>) {
    hostshim_ossl::init_library(path);
}

/// Prepares libcrypto for concurrent use when `enable` is set.
///
/// Runs at most once per process; repeated calls report the existing state.
/// Aborts the process if the lock table cannot be allocated.
pub fn bootstrap_thread_safety(enable: bool) -> ThreadSafety {
    hostshim_ossl::init_thread_safety(enable)
}

/// Initialized shim
#[derive(Debug)]
pub struct Shim {
    config: ShimConfig,
    thread_safety: ThreadSafety,
}

impl Shim {
    /// Sets up logging (when a sink is configured), binds libcrypto, and
    /// runs the thread-safety bootstrap.
    pub fn init(config: ShimConfig) -> ShimResult<Self> {
        if config.wants_logging() {
            init_logging(&config)?;
        }

        bootstrap_crypto(config.libcrypto_path.as_deref());
        let thread_safety = bootstrap_thread_safety(config.thread_safety);

        tracing::debug!(?config, ?thread_safety, "hostshim initialized");
        Ok(Self {
            config,
            thread_safety,
        })
    }

    /// [`Shim::init`] with [`ShimConfig::from_env`].
    pub fn from_env() -> ShimResult<Self> {
        Self::init(ShimConfig::from_env()?)
    }

    /// The configuration the shim was initialized with.
    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Outcome of the thread-safety bootstrap.
    pub fn thread_safety(&self) -> ThreadSafety {
        self.thread_safety
    }

    /// Whether libcrypto is bound and digests can be computed.
    pub fn crypto_available(&self) -> bool {
        hostshim_ossl::is_available()
    }

    /// Sets the access and modification time of `path` to `timestamp`
    /// seconds since the Unix epoch.
    pub fn set_mtime(&self, path: &Path, timestamp: f64) -> ShimResult<()> {
        Ok(hostshim_os::set_mtime(path, timestamp)?)
    }

    /// Starts a digest session for the algorithm called `algorithm`
    /// (`sha1` or `sha256`, any case).
    pub fn digest_init(&self, algorithm: &str) -> ShimResult<DigestContext> {
        Ok(DigestContext::init(algorithm)?)
    }

    /// Feeds `data` into a digest session.
    pub fn digest_update(&self, context: &mut DigestContext, data: &[u8]) -> ShimResult<()> {
        Ok(context.update(data)?)
    }

    /// Ends a digest session and returns the digest.
    pub fn digest_final(&self, context: DigestContext) -> ShimResult<Vec<u8>> {
        Ok(context.finalize()?)
    }

    /// Kernel name, release and machine. Unsupported on Windows.
    pub fn os_identity(&self) -> ShimResult<OsIdentity> {
        Ok(hostshim_os::os_identity()?)
    }

    /// Column count of the terminal on stdout, or the configured default.
    pub fn terminal_width(&self) -> u16 {
        hostshim_os::terminal_width_or(self.config.default_terminal_width)
    }

    /// Absolute path of a special folder. Windows only.
    pub fn special_folder(&self, folder: SpecialFolder) -> ShimResult<PathBuf> {
        Ok(hostshim_os::special_folder(folder)?)
    }

    /// Reads a string value under `HKEY_LOCAL_MACHINE`. `view` is 0 for the
    /// default view, 1 for the 32-bit view, 2 for the 64-bit view.
    pub fn read_registry_string(&self, key: &str, value: &str, view: i32) -> ShimResult<String> {
        let view = RegistryView::try_from(view)?;
        Ok(hostshim_os::read_registry_string(key, value, view)?)
    }

    /// Reads a `REG_DWORD` value under `HKEY_LOCAL_MACHINE`. `view` is as
    /// for [`Shim::read_registry_string`].
    pub fn read_registry_int(&self, key: &str, value: &str, view: i32) -> ShimResult<u32> {
        let view = RegistryView::try_from(view)?;
        Ok(hostshim_os::read_registry_int(key, value, view)?)
    }
}
