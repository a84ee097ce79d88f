// Copyright (C) Microsoft Corporation. All rights reserved.

//! File modification times.

use std::path::Path;

use crate::OsError;
use crate::OsResult;

const MICROS_PER_SEC: u32 = 1_000_000;

/// Splits a POSIX timestamp into whole seconds and microseconds.
///
/// Seconds are floored, so the microsecond part is always in
/// `0..1_000_000`, negative timestamps included. Microseconds are rounded
/// to nearest, carrying into the seconds.
pub(crate) fn split_timestamp(timestamp: f64) -> OsResult<(i64, u32)> {
    if !timestamp.is_finite() {
        Err(OsError::InvalidArgument(format!(
            "timestamp {timestamp} is not finite"
        )))?;
    }

    let secs = timestamp.floor();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if secs < i64::MIN as f64 || secs >= i64::MAX as f64 {
        Err(OsError::InvalidArgument(format!(
            "timestamp {timestamp} is out of range"
        )))?;
    }

    let mut secs = secs as i64;
    let mut micros = ((timestamp - secs as f64) * f64::from(MICROS_PER_SEC)).round() as u32;
    if micros >= MICROS_PER_SEC {
        secs = secs.checked_add(1).ok_or_else(|| {
            OsError::InvalidArgument(format!("timestamp {timestamp} is out of range"))
        })?;
        micros = 0;
    }

    Ok((secs, micros))
}

/// Sets both the access and modification time of `path` to `timestamp`,
/// in seconds since the Unix epoch.
///
/// Directories are accepted. Precision is whatever the file system keeps,
/// at best one microsecond.
pub fn set_mtime(path: &Path, timestamp: f64) -> OsResult<()> {
    let (secs, micros) = split_timestamp(timestamp)?;

    set_times(path, secs, micros).map_err(|e| {
        tracing::debug!(path = %path.display(), timestamp, "set_mtime failed: {e}");
        e
    })
}

#[cfg(unix)]
fn set_times(path: &Path, secs: i64, micros: u32) -> OsResult<()> {
    use nix::libc::suseconds_t;
    use nix::libc::time_t;
    use nix::sys::stat::utimes;
    use nix::sys::time::TimeVal;

    let secs = time_t::try_from(secs)
        .map_err(|_| OsError::InvalidArgument(format!("{secs} does not fit time_t")))?;
    let time = TimeVal::new(secs, micros as suseconds_t);

    utimes(path, &time, &time)?;
    Ok(())
}

#[cfg(windows)]
fn set_times(path: &Path, secs: i64, micros: u32) -> OsResult<()> {
    use std::fs::FileTimes;
    use std::fs::OpenOptions;
    use std::os::windows::fs::OpenOptionsExt;
    use std::time::Duration;
    use std::time::SystemTime;

    use windows::Win32::Storage::FileSystem::FILE_FLAG_BACKUP_SEMANTICS;
    use windows::Win32::Storage::FileSystem::FILE_WRITE_ATTRIBUTES;

    let out_of_range = || OsError::InvalidArgument(format!("{secs}.{micros:06} is out of range"));

    let whole = Duration::from_secs(secs.unsigned_abs());
    let time = if secs >= 0 {
        SystemTime::UNIX_EPOCH.checked_add(whole)
    } else {
        SystemTime::UNIX_EPOCH.checked_sub(whole)
    }
    .and_then(|t| t.checked_add(Duration::from_micros(u64::from(micros))))
    .ok_or_else(out_of_range)?;

    // Backup semantics lets the handle refer to a directory.
    let file = OpenOptions::new()
        .access_mode(FILE_WRITE_ATTRIBUTES.0)
        .custom_flags(FILE_FLAG_BACKUP_SEMANTICS.0)
        .open(path)?;

    file.set_times(FileTimes::new().set_accessed(time).set_modified(time))?;
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn set_times(_path: &Path, _secs: i64, _micros: u32) -> OsResult<()> {
    Err(OsError::Unsupported)
}
