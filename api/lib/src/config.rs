// Copyright (C) Microsoft Corporation. All rights reserved.

use std::env::var_os;
use std::ffi::OsString;
use std::path::PathBuf;

use hostshim_os::DEFAULT_TERMINAL_WIDTH;

use crate::ShimError;
use crate::ShimResult;

/// Explicit libcrypto to load before the default names.
pub const ENV_LIBCRYPTO: &str = "HOSTSHIM_LIBCRYPTO";
/// Whether to install libcrypto locking callbacks.
pub const ENV_THREAD_SAFETY: &str = "HOSTSHIM_THREAD_SAFETY";
/// Terminal width reported when stdout is not a terminal.
pub const ENV_TERMINAL_WIDTH: &str = "HOSTSHIM_TERMINAL_WIDTH";
/// When set, logs go to stderr.
pub const ENV_LOG_STDERR: &str = "HOSTSHIM_LOG_STDERR";
/// Path of a log file to create.
pub const ENV_LOG_FILE: &str = "HOSTSHIM_LOG_FILE";

/// Shim configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    /// libcrypto tried before the platform default names
    pub libcrypto_path: Option<PathBuf>,

    /// Install locking callbacks for a multi-threaded embedder
    pub thread_safety: bool,

    /// Width reported when stdout is not a terminal
    pub default_terminal_width: u16,

    /// Pretty log output to stderr
    pub log_stderr: bool,

    /// Compact log output to this file
    pub log_file: Option<PathBuf>,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            libcrypto_path: None,
            thread_safety: true,
            default_terminal_width: DEFAULT_TERMINAL_WIDTH,
            log_stderr: false,
            log_file: None,
        }
    }
}

impl ShimConfig {
    /// Builds the configuration from `HOSTSHIM_*` environment variables.
    pub fn from_env() -> ShimResult<Self> {
        Self::from_lookup(|name| var_os(name))
    }

    /// Builds the configuration from an arbitrary variable source. Unset
    /// variables keep their defaults; malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> ShimResult<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_LIBCRYPTO).filter(|v| !v.is_empty()) {
            config.libcrypto_path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup(ENV_THREAD_SAFETY) {
            config.thread_safety = parse_flag(ENV_THREAD_SAFETY, &value)?;
        }

        if let Some(value) = lookup(ENV_TERMINAL_WIDTH) {
            config.default_terminal_width = parse_width(&value)?;
        }

        config.log_stderr = lookup(ENV_LOG_STDERR).is_some();

        if let Some(path) = lookup(ENV_LOG_FILE).filter(|v| !v.is_empty()) {
            config.log_file = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Whether any log sink is configured.
    pub fn wants_logging(&self) -> bool {
        self.log_stderr || self.log_file.is_some()
    }
}

fn parse_flag(name: &str, value: &OsString) -> ShimResult<bool> {
    let text = value.to_string_lossy();
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ShimError::Config(format!("{name}={text:?} is not a boolean"))),
    }
}

fn parse_width(value: &OsString) -> ShimResult<u16> {
    let text = value.to_string_lossy();
    match text.trim().parse::<u16>() {
        Ok(width) if width > 0 => Ok(width),
        _ => Err(ShimError::Config(format!(
            "{ENV_TERMINAL_WIDTH}={text:?} is not a positive column count"
        ))),
    }
}
