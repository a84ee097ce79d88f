// Copyright (C) Microsoft Corporation. All rights reserved.

//! Windows special folders.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::OsError;
use crate::OsResult;

/// Per-user and machine-wide application data folders.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpecialFolder {
    /// Roaming per-user data, `%APPDATA%`.
    AppData,
    /// Non-roaming per-user data, `%LOCALAPPDATA%`.
    LocalAppData,
    /// Data shared by all users, `%ProgramData%`.
    CommonAppData,
}

impl SpecialFolder {
    pub const fn name(self) -> &'static str {
        match self {
            SpecialFolder::AppData => "AppData",
            SpecialFolder::LocalAppData => "LocalAppData",
            SpecialFolder::CommonAppData => "CommonAppData",
        }
    }
}

impl fmt::Display for SpecialFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpecialFolder {
    type Err = OsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            SpecialFolder::AppData,
            SpecialFolder::LocalAppData,
            SpecialFolder::CommonAppData,
        ]
        .into_iter()
        .find(|folder| folder.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| OsError::InvalidArgument(format!("unknown special folder {s:?}")))
    }
}

/// Resolves `folder` to an absolute path, creating it if it does not exist
/// yet.
#[cfg(windows)]
pub fn special_folder(folder: SpecialFolder) -> OsResult<PathBuf> {
    use std::ffi::c_void;

    use scopeguard::guard;
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::System::Com::CoTaskMemFree;
    use windows::Win32::UI::Shell::*;

    let id = match folder {
        SpecialFolder::AppData => FOLDERID_RoamingAppData,
        SpecialFolder::LocalAppData => FOLDERID_LocalAppData,
        SpecialFolder::CommonAppData => FOLDERID_ProgramData,
    };

    // SAFETY: `id` is a valid known-folder id; the returned string is owned
    // by the caller and freed by the guard below.
    let path = unsafe { SHGetKnownFolderPath(&id, KF_FLAG_CREATE, HANDLE::default()) }
        .map_err(|e| {
            tracing::error!(%folder, "SHGetKnownFolderPath failed: {e}");
            OsError::FolderUnavailable
        })?;
    // SAFETY: `path` came from SHGetKnownFolderPath and is freed exactly once.
    let path = guard(path, |path| unsafe {
        CoTaskMemFree(Some(path.0 as *const c_void))
    });

    // SAFETY: `path` is a NUL terminated wide string.
    let wide = unsafe { widestring::U16CStr::from_ptr_str(path.0) };
    Ok(PathBuf::from(wide.to_os_string()))
}

/// Resolves `folder` to an absolute path.
///
/// Special folders are a Windows notion; elsewhere this always fails with
/// [`OsError::Unsupported`].
#[cfg(not(windows))]
pub fn special_folder(folder: SpecialFolder) -> OsResult<PathBuf> {
    tracing::debug!(%folder, "special folders exist only on Windows");
    Err(OsError::Unsupported)
}
