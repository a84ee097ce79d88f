// Copyright (C) Microsoft Corporation. All rights reserved.

//! Operating system identity.

use crate::OsResult;

/// Kernel name, release and hardware name as reported by `uname(2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsIdentity {
    /// Kernel name, e.g. `Linux` or `Darwin`.
    pub system: String,
    pub release: String,
    /// Hardware name, e.g. `x86_64`.
    pub machine: String,
}

/// Returns the identity of the running kernel.
#[cfg(unix)]
pub fn os_identity() -> OsResult<OsIdentity> {
    let uts = nix::sys::utsname::uname()?;

    Ok(OsIdentity {
        system: uts.sysname().to_string_lossy().into_owned(),
        release: uts.release().to_string_lossy().into_owned(),
        machine: uts.machine().to_string_lossy().into_owned(),
    })
}

/// Returns the identity of the running kernel.
///
/// Windows has no `uname`; this always fails with
/// [`OsError::Unsupported`](crate::OsError::Unsupported).
#[cfg(not(unix))]
pub fn os_identity() -> OsResult<OsIdentity> {
    Err(crate::OsError::Unsupported)
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_os_identity() {
        let identity = os_identity().expect("uname");
        tracing::debug!(?identity);

        assert!(!identity.system.is_empty());
        assert!(!identity.release.is_empty());
        assert!(!identity.machine.is_empty());

        #[cfg(target_os = "linux")]
        assert_eq!(identity.system, "Linux");
        #[cfg(target_os = "macos")]
        assert_eq!(identity.system, "Darwin");
    }

    #[cfg(not(unix))]
    #[test]
    fn test_os_identity_unsupported() {
        assert_eq!(os_identity(), Err(crate::OsError::Unsupported));
    }
}
