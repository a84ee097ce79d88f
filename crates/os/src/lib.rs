// Copyright (C) Microsoft Corporation. All rights reserved.

//! Thin wrappers over the OS calls a host runtime cannot make portably.
//!
//! Every function is a stateless one-shot call. Windows-only services
//! ([`folders`], [`registry`]) exist on every platform and report
//! [`OsError::Unsupported`] elsewhere, so callers need no `cfg` of their own.

pub mod folders;
pub mod mtime;
pub mod registry;
pub mod terminal;
pub mod uname;

pub use folders::special_folder;
pub use folders::SpecialFolder;
pub use mtime::set_mtime;
pub use registry::read_registry_int;
pub use registry::read_registry_string;
pub use registry::RegistryView;
pub use registry::REGISTRY_VALUE_LIMIT;
pub use terminal::terminal_width;
pub use terminal::terminal_width_or;
pub use terminal::DEFAULT_TERMINAL_WIDTH;
pub use uname::os_identity;
pub use uname::OsIdentity;

/// OS layer error type
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OsError {
    /// The path does not exist
    #[error("Path not found")]
    PathNotFound,

    /// The caller lacks permission for the operation
    #[error("Permission denied")]
    PermissionDenied,

    /// Any other OS failure, with the raw error code
    #[error("OS error {code}: {message}")]
    Os { code: i32, message: String },

    /// The operation does not exist on this platform
    #[error("Operation not supported on this platform")]
    Unsupported,

    /// An argument cannot be passed to the OS
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The special folder could not be resolved
    #[error("Special folder unavailable")]
    FolderUnavailable,

    /// The registry key or value does not exist
    #[error("Registry key or value not found")]
    KeyNotFound,

    /// The registry value does not fit the read buffer
    #[error("Registry value too large")]
    ValueTooLarge,

    /// The registry value has a different type than requested
    #[error("Registry value has the wrong type")]
    TypeMismatch,
}

pub type OsResult<T> = Result<T, OsError>;

impl From<std::io::Error> for OsError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => OsError::PathNotFound,
            std::io::ErrorKind::PermissionDenied => OsError::PermissionDenied,
            _ => OsError::Os {
                code: e.raw_os_error().unwrap_or(-1),
                message: e.to_string(),
            },
        }
    }
}

#[cfg(unix)]
impl From<nix::errno::Errno> for OsError {
    fn from(errno: nix::errno::Errno) -> Self {
        use nix::errno::Errno;

        match errno {
            Errno::ENOENT | Errno::ENOTDIR => OsError::PathNotFound,
            Errno::EACCES | Errno::EPERM | Errno::EROFS => OsError::PermissionDenied,
            _ => OsError::Os {
                code: errno as i32,
                message: errno.desc().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let not_found = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert_eq!(OsError::from(not_found), OsError::PathNotFound);

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(OsError::from(denied), OsError::PermissionDenied);

        let other = std::io::Error::new(std::io::ErrorKind::Other, "device gone");
        assert_eq!(
            OsError::from(other),
            OsError::Os {
                code: -1,
                message: "device gone".to_string(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_errno_mapping() {
        use nix::errno::Errno;

        assert_eq!(OsError::from(Errno::ENOENT), OsError::PathNotFound);
        assert_eq!(OsError::from(Errno::EACCES), OsError::PermissionDenied);
        assert_eq!(OsError::from(Errno::EPERM), OsError::PermissionDenied);
        assert_eq!(
            OsError::from(Errno::EIO),
            OsError::Os {
                code: Errno::EIO as i32,
                message: Errno::EIO.desc().to_string(),
            }
        );
    }
}
