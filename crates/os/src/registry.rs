// Copyright (C) Microsoft Corporation. All rights reserved.

//! Reads of `HKEY_LOCAL_MACHINE` registry values.
//!
//! Values are read into a fixed buffer of [`REGISTRY_VALUE_LIMIT`] bytes.
//! Anything that does not fit, terminator included, is reported as
//! [`OsError::ValueTooLarge`] rather than truncated.

use crate::OsError;
use crate::OsResult;

/// Largest registry value read, in bytes.
pub const REGISTRY_VALUE_LIMIT: usize = 4096;

/// Which registry view of a 64-bit system to read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RegistryView {
    /// The view matching the calling process.
    #[default]
    Default,
    /// The 32-bit (WOW64) view.
    Wow32,
    /// The native 64-bit view.
    Wow64,
}

impl TryFrom<i32> for RegistryView {
    type Error = OsError;

    fn try_from(selector: i32) -> Result<Self, Self::Error> {
        match selector {
            0 => Ok(RegistryView::Default),
            1 => Ok(RegistryView::Wow32),
            2 => Ok(RegistryView::Wow64),
            _ => Err(OsError::InvalidArgument(format!(
                "registry view selector {selector}"
            ))),
        }
    }
}

/// Decodes `len` bytes of a `REG_SZ` value.
///
/// The value must leave room for a terminator inside the read limit. Data
/// after the first NUL is ignored.
pub(crate) fn decode_registry_string(buf: &[u8], len: usize) -> OsResult<String> {
    if len >= REGISTRY_VALUE_LIMIT || len > buf.len() {
        Err(OsError::ValueTooLarge)?;
    }
    if len % 2 != 0 {
        tracing::error!(len, "REG_SZ value has an odd byte length");
        Err(OsError::TypeMismatch)?;
    }

    let units: Vec<u16> = buf[..len]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();

    Ok(String::from_utf16_lossy(&units))
}

#[cfg(windows)]
mod sys {
    use widestring::U16CString;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::*;
    use windows::Win32::System::Registry::*;

    use super::*;

    /// An open registry key, closed on drop.
    struct OpenKey(HKEY);

    impl Drop for OpenKey {
        fn drop(&mut self) {
            // SAFETY: the key was opened by RegOpenKeyExW and is closed once.
            let status = unsafe { RegCloseKey(self.0) };
            if status != ERROR_SUCCESS {
                tracing::warn!("RegCloseKey failed: {}", status.0);
            }
        }
    }

    fn wide(s: &str) -> OsResult<U16CString> {
        U16CString::from_str(s)
            .map_err(|_| OsError::InvalidArgument(format!("{s:?} contains NUL")))
    }

    fn status_to_error(status: WIN32_ERROR) -> OsError {
        match status {
            ERROR_FILE_NOT_FOUND | ERROR_PATH_NOT_FOUND => OsError::KeyNotFound,
            ERROR_ACCESS_DENIED => OsError::PermissionDenied,
            ERROR_MORE_DATA => OsError::ValueTooLarge,
            _ => OsError::Os {
                code: status.0 as i32,
                message: status.to_hresult().message(),
            },
        }
    }

    fn open_key(key_path: &str, view: RegistryView) -> OsResult<OpenKey> {
        let key_path = wide(key_path)?;
        let access = match view {
            RegistryView::Default => KEY_READ,
            RegistryView::Wow32 => KEY_READ | KEY_WOW64_32KEY,
            RegistryView::Wow64 => KEY_READ | KEY_WOW64_64KEY,
        };

        let mut key = HKEY::default();
        // SAFETY: the path is NUL terminated and `key` is a valid out pointer.
        let status = unsafe {
            RegOpenKeyExW(
                HKEY_LOCAL_MACHINE,
                PCWSTR(key_path.as_ptr()),
                0,
                access,
                &mut key,
            )
        };
        if status != ERROR_SUCCESS {
            Err(status_to_error(status))?;
        }
        Ok(OpenKey(key))
    }

    /// Reads `value_name` into `buf`, returning its type and length.
    fn query_value(
        key: &OpenKey,
        value_name: &str,
        buf: &mut [u8],
    ) -> OsResult<(REG_VALUE_TYPE, usize)> {
        let value_name = wide(value_name)?;
        let mut kind = REG_VALUE_TYPE::default();
        let mut size = u32::try_from(buf.len()).map_err(|_| OsError::ValueTooLarge)?;

        // SAFETY: `buf` holds `size` writable bytes and the name is NUL
        // terminated.
        let status = unsafe {
            RegQueryValueExW(
                key.0,
                PCWSTR(value_name.as_ptr()),
                None,
                Some(&mut kind),
                Some(buf.as_mut_ptr()),
                Some(&mut size),
            )
        };
        if status != ERROR_SUCCESS {
            Err(status_to_error(status))?;
        }
        Ok((kind, size as usize))
    }

    pub(super) fn read_string(
        key_path: &str,
        value_name: &str,
        view: RegistryView,
    ) -> OsResult<String> {
        let key = open_key(key_path, view)?;
        let mut buf = vec![0u8; REGISTRY_VALUE_LIMIT];
        let (kind, len) = query_value(&key, value_name, &mut buf)?;

        if kind != REG_SZ && kind != REG_EXPAND_SZ {
            Err(OsError::TypeMismatch)?;
        }
        decode_registry_string(&buf, len)
    }

    pub(super) fn read_int(key_path: &str, value_name: &str, view: RegistryView) -> OsResult<u32> {
        let key = open_key(key_path, view)?;
        // Full-size buffer, so a value of another type reports a mismatch
        // rather than not fitting.
        let mut buf = vec![0u8; REGISTRY_VALUE_LIMIT];
        let (kind, len) = query_value(&key, value_name, &mut buf)?;

        if kind != REG_DWORD || len != 4 {
            Err(OsError::TypeMismatch)?;
        }
        Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
    }
}

/// Reads a string value of `HKEY_LOCAL_MACHINE\<key_path>`.
///
/// `REG_SZ` and `REG_EXPAND_SZ` values are accepted; expandable strings are
/// returned unexpanded. Fails with [`OsError::Unsupported`] off Windows.
pub fn read_registry_string(
    key_path: &str,
    value_name: &str,
    view: RegistryView,
) -> OsResult<String> {
    #[cfg(windows)]
    let result = sys::read_string(key_path, value_name, view);
    #[cfg(not(windows))]
    let result = Err(OsError::Unsupported);

    if let Err(e) = &result {
        tracing::debug!(key_path, value_name, ?view, "read_registry_string: {e}");
    }
    result
}

/// Reads a `REG_DWORD` value of `HKEY_LOCAL_MACHINE\<key_path>`.
///
/// Fails with [`OsError::Unsupported`] off Windows.
pub fn read_registry_int(key_path: &str, value_name: &str, view: RegistryView) -> OsResult<u32> {
    #[cfg(windows)]
    let result = sys::read_int(key_path, value_name, view);
    #[cfg(not(windows))]
    let result = Err(OsError::Unsupported);

    if let Err(e) = &result {
        tracing::debug!(key_path, value_name, ?view, "read_registry_int: {e}");
    }
    result
}
