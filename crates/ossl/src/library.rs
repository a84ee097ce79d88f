// Copyright (C) Microsoft Corporation. All rights reserved.

//! Load-time binding of libcrypto.
//!
//! The library is opened with `libloading` rather than linked, so a process
//! without OpenSSL still starts. Whether libcrypto is usable is decided once,
//! by the first call to [`init_library`] (or implicitly by the first digest),
//! and cached for the lifetime of the process. Every later lookup returns the
//! same answer without touching the filesystem again.
//!
//! Symbol names differ between OpenSSL 1.0, 1.1 and 3.x; each entry point is
//! resolved from a list of alternatives.

use std::ffi::c_char;
use std::ffi::CStr;
use std::path::Path;
use std::path::PathBuf;
use std::ptr::null;
use std::sync::OnceLock;

use libloading::Library;

use crate::error::*;
use crate::ffi::*;

#[cfg(all(unix, not(target_os = "macos")))]
const DEFAULT_LIBRARY_NAMES: &[&str] = &[
    "libcrypto.so.3",
    "libcrypto.so.1.1",
    "libcrypto.so.1.0.0",
    "libcrypto.so.10",
    "libcrypto.so",
];

#[cfg(target_os = "macos")]
const DEFAULT_LIBRARY_NAMES: &[&str] = &[
    "libcrypto.3.dylib",
    "libcrypto.1.1.dylib",
    "libcrypto.dylib",
];

#[cfg(windows)]
const DEFAULT_LIBRARY_NAMES: &[&str] = &[
    "libcrypto-3-x64.dll",
    "libcrypto-3.dll",
    "libcrypto-1_1-x64.dll",
    "libcrypto-1_1.dll",
    "libeay32.dll",
];

/// Longest message `ERR_error_string_n` is asked to write.
const ERROR_STRING_LEN: usize = 256;

/// Upper bound on queued errors collected per drain.
const MAX_DRAINED_ERRORS: usize = 16;

static LIBCRYPTO: OnceLock<Option<Libcrypto>> = OnceLock::new();

/// Entry points used to run digests.
pub(crate) struct DigestFns {
    pub(crate) md_ctx_new: EvpMdCtxNewFn,
    pub(crate) md_ctx_free: EvpMdCtxFreeFn,
    pub(crate) get_digest_by_name: EvpGetDigestByNameFn,
    pub(crate) md_size: EvpMdSizeFn,
    pub(crate) digest_init_ex: EvpDigestInitExFn,
    pub(crate) digest_update: EvpDigestUpdateFn,
    pub(crate) digest_final_ex: EvpDigestFinalExFn,
}

/// Thread identity hook, newest flavor first.
#[derive(Clone, Copy)]
pub(crate) enum ThreadIdHook {
    ThreadId {
        set_callback: CryptoThreadIdSetCallbackFn,
        set_numeric: CryptoThreadIdSetNumericFn,
    },
    Legacy {
        set_callback: CryptoSetIdCallbackFn,
    },
}

/// Locking hooks. Only libcrypto 1.0.x and older export these; newer
/// releases lock internally and define the setters as no-op macros.
pub(crate) struct LockingHooks {
    pub(crate) num_locks: CryptoNumLocksFn,
    pub(crate) set_locking_callback: CryptoSetLockingCallbackFn,
    pub(crate) thread_id: Option<ThreadIdHook>,
    pub(crate) set_dynlock_create: Option<CryptoSetDynlockCreateCallbackFn>,
    pub(crate) set_dynlock_lock: Option<CryptoSetDynlockLockCallbackFn>,
    pub(crate) set_dynlock_destroy: Option<CryptoSetDynlockDestroyCallbackFn>,
}

/// A loaded and initialized libcrypto.
pub struct Libcrypto {
    // Keeps every resolved function pointer below valid.
    _library: Library,
    path: PathBuf,
    version: Option<String>,
    pub(crate) digest: DigestFns,
    pub(crate) locking: Option<LockingHooks>,
    err_get_error: Option<ErrGetErrorFn>,
    err_error_string_n: Option<ErrErrorStringNFn>,
}

/// Loads libcrypto once for the whole process.
///
/// `path` is tried before the platform's default library names. Failure is
/// not an error for the caller: it is logged and leaves the process in
/// degraded mode where digests fail with [`CryptoError::EngineUnavailable`].
/// Calls after the first one do nothing.
pub fn init_library(path: Option<&Path>) {
    let mut first = false;
    LIBCRYPTO.get_or_init(|| {
        first = true;
        load_or_degrade(path)
    });

    if !first {
        tracing::debug!(?path, "init_library: libcrypto binding already decided");
    }
}

/// Returns true when libcrypto was loaded successfully.
pub fn is_available() -> bool {
    Libcrypto::get().is_some()
}

fn load_or_degrade(path: Option<&Path>) -> Option<Libcrypto> {
    match Libcrypto::load(path) {
        Ok(lib) => {
            tracing::info!(
                path = %lib.path.display(),
                version = lib.version().unwrap_or("unknown"),
                thread_hooks = lib.locking.is_some(),
                "libcrypto loaded"
            );
            Some(lib)
        }
        Err(e) => {
            tracing::warn!("libcrypto unavailable, digests disabled: {e}");
            None
        }
    }
}

/// Resolves the first symbol of `names` that the library exports.
///
/// # Safety
/// `T` must be the function pointer type matching the C declaration of
/// every name in `names`.
unsafe fn symbol<T: Copy>(lib: &Library, names: &[&str]) -> Option<T> {
    names.iter().find_map(|name| {
        // SAFETY: the caller guarantees `T` matches the symbol's type.
        unsafe { lib.get::<T>(name.as_bytes()) }.ok().map(|sym| *sym)
    })
}

/// Like [`symbol`], but the symbol is required.
///
/// # Safety
/// Same contract as [`symbol`].
unsafe fn required<T: Copy>(lib: &Library, names: &[&str]) -> CryptoResult<T> {
    // SAFETY: forwarded contract.
    unsafe { symbol(lib, names) }.ok_or_else(|| CryptoError::MissingSymbol(names.join("|")))
}

impl Libcrypto {
    /// Returns the process-wide libcrypto, loading it from the default
    /// locations if nothing has decided the binding yet.
    pub fn get() -> Option<&'static Libcrypto> {
        LIBCRYPTO.get_or_init(|| load_or_degrade(None)).as_ref()
    }

    /// Opens and initializes a libcrypto without registering it globally.
    pub fn load(path: Option<&Path>) -> CryptoResult<Self> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = path {
            candidates.push(path.to_path_buf());
        }
        candidates.extend(DEFAULT_LIBRARY_NAMES.iter().map(PathBuf::from));

        // A candidate that opens but does not bind is skipped like one that
        // does not open, so a wrong explicit path still reaches the defaults.
        let mut failures = Vec::new();
        for candidate in candidates {
            let shown = candidate.display().to_string();

            // SAFETY: loading libcrypto runs its initializers, which have no
            // preconditions on the caller.
            let library = match unsafe { Library::new(&candidate) } {
                Ok(library) => library,
                Err(e) => {
                    tracing::trace!(candidate = %shown, "dlopen failed: {e}");
                    failures.push(format!("{shown}: {e}"));
                    continue;
                }
            };

            match Self::bind(library, candidate) {
                Ok(lib) => return Ok(lib),
                Err(e) => {
                    tracing::debug!(candidate = %shown, "not a usable libcrypto: {e}");
                    failures.push(format!("{shown}: {e}"));
                }
            }
        }

        Err(CryptoError::LibraryLoad(failures.join("; ")))
    }

    fn bind(library: Library, path: PathBuf) -> CryptoResult<Self> {
        // SAFETY: each type alias mirrors the C prototype of the names it is
        // resolved from.
        let digest = unsafe {
            DigestFns {
                md_ctx_new: required(&library, &["EVP_MD_CTX_new", "EVP_MD_CTX_create"])?,
                md_ctx_free: required(&library, &["EVP_MD_CTX_free", "EVP_MD_CTX_destroy"])?,
                get_digest_by_name: required(&library, &["EVP_get_digestbyname"])?,
                md_size: required(&library, &["EVP_MD_get_size", "EVP_MD_size"])?,
                digest_init_ex: required(&library, &["EVP_DigestInit_ex"])?,
                digest_update: required(&library, &["EVP_DigestUpdate"])?,
                digest_final_ex: required(&library, &["EVP_DigestFinal_ex"])?,
            }
        };

        // SAFETY: as above.
        let locking = unsafe { Self::bind_locking(&library) };

        // SAFETY: as above.
        let (init_crypto, add_all_digests, version_fn, err_get_error, err_error_string_n) = unsafe {
            (
                symbol::<OpensslInitCryptoFn>(&library, &["OPENSSL_init_crypto"]),
                symbol::<OpensslAddAllDigestsFn>(&library, &["OpenSSL_add_all_digests"]),
                symbol::<OpensslVersionFn>(&library, &["OpenSSL_version", "SSLeay_version"]),
                symbol::<ErrGetErrorFn>(&library, &["ERR_get_error"]),
                symbol::<ErrErrorStringNFn>(&library, &["ERR_error_string_n"]),
            )
        };

        if let Some(init_crypto) = init_crypto {
            // SAFETY: a null settings pointer selects the defaults.
            let res = unsafe {
                init_crypto(
                    OPENSSL_INIT_ADD_ALL_DIGESTS | OPENSSL_INIT_LOAD_CRYPTO_STRINGS,
                    null(),
                )
            };
            if res != 1 {
                Err(CryptoError::LibraryLoad(format!(
                    "{}: OPENSSL_init_crypto failed",
                    path.display()
                )))?;
            }
        } else if let Some(add_all_digests) = add_all_digests {
            // SAFETY: takes no arguments and only fills libcrypto's name table.
            unsafe { add_all_digests() };
        }

        let version = version_fn.and_then(|version_fn| {
            // SAFETY: returns a pointer to a static string, or null.
            let version = unsafe { version_fn(OPENSSL_VERSION) };
            if version.is_null() {
                return None;
            }
            // SAFETY: non-null and NUL terminated per the OpenSSL API.
            let version = unsafe { CStr::from_ptr(version) };
            Some(version.to_string_lossy().into_owned())
        });

        Ok(Self {
            _library: library,
            path,
            version,
            digest,
            locking,
            err_get_error,
            err_error_string_n,
        })
    }

    /// # Safety
    /// Same contract as [`symbol`].
    unsafe fn bind_locking(library: &Library) -> Option<LockingHooks> {
        // SAFETY: forwarded contract.
        unsafe {
            let num_locks = symbol::<CryptoNumLocksFn>(library, &["CRYPTO_num_locks"])?;
            let set_locking_callback =
                symbol::<CryptoSetLockingCallbackFn>(library, &["CRYPTO_set_locking_callback"])?;

            let thread_id = match (
                symbol::<CryptoThreadIdSetCallbackFn>(library, &["CRYPTO_THREADID_set_callback"]),
                symbol::<CryptoThreadIdSetNumericFn>(library, &["CRYPTO_THREADID_set_numeric"]),
            ) {
                (Some(set_callback), Some(set_numeric)) => Some(ThreadIdHook::ThreadId {
                    set_callback,
                    set_numeric,
                }),
                _ => symbol::<CryptoSetIdCallbackFn>(library, &["CRYPTO_set_id_callback"])
                    .map(|set_callback| ThreadIdHook::Legacy { set_callback }),
            };

            Some(LockingHooks {
                num_locks,
                set_locking_callback,
                thread_id,
                set_dynlock_create: symbol(library, &["CRYPTO_set_dynlock_create_callback"]),
                set_dynlock_lock: symbol(library, &["CRYPTO_set_dynlock_lock_callback"]),
                set_dynlock_destroy: symbol(library, &["CRYPTO_set_dynlock_destroy_callback"]),
            })
        }
    }

    /// Path the library was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version string reported by the library.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether the library needs locking callbacks from its embedder.
    pub fn needs_locking_callbacks(&self) -> bool {
        self.locking.is_some()
    }

    /// Pops every error queued on the calling thread and renders it.
    pub fn drain_errors(&self) -> Vec<String> {
        let (Some(get_error), Some(error_string)) = (self.err_get_error, self.err_error_string_n)
        else {
            return Vec::new();
        };

        let mut errors = Vec::new();
        while errors.len() < MAX_DRAINED_ERRORS {
            // SAFETY: reads and pops the calling thread's error queue.
            let code = unsafe { get_error() };
            if code == 0 {
                break;
            }

            let mut buf = [0 as c_char; ERROR_STRING_LEN];
            // SAFETY: the length passed matches the buffer, which the
            // function always NUL terminates.
            let message = unsafe {
                error_string(code, buf.as_mut_ptr(), buf.len());
                CStr::from_ptr(buf.as_ptr())
            };
            errors.push(message.to_string_lossy().into_owned());
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;

    #[test]
    fn test_load_bogus_path_falls_back_or_fails_cleanly() {
        let bogus = Path::new("/nonexistent/hostshim/libcrypto.so");
        match Libcrypto::load(Some(bogus)) {
            // A system libcrypto was found through the default names.
            Ok(lib) => assert_ne!(lib.path(), bogus),
            Err(CryptoError::LibraryLoad(msg)) => {
                assert!(msg.contains("/nonexistent/hostshim/libcrypto.so"), "{msg}")
            }
            Err(e) => panic!("unexpected error {e}"),
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn test_load_wrong_library_falls_back_to_defaults() {
        // libc opens fine but exports no EVP symbols.
        let wrong = Path::new("libc.so.6");
        let defaults = Libcrypto::load(None);

        match Libcrypto::load(Some(wrong)) {
            Ok(lib) => {
                assert_ne!(lib.path(), wrong);
                assert_eq!(
                    defaults.as_ref().map(|lib| lib.path().to_path_buf()).ok(),
                    Some(lib.path().to_path_buf())
                );
            }
            Err(CryptoError::LibraryLoad(msg)) => {
                assert!(defaults.is_err(), "defaults loaded but fallback failed");
                assert!(msg.contains("libc.so.6"), "{msg}");
                assert!(msg.contains("EVP_MD_CTX_new"), "{msg}");
            }
            Err(e) => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn test_binding_is_decided_once() {
        let first = is_available();
        init_library(Some(Path::new("/nonexistent/hostshim/libcrypto.so")));
        assert_eq!(is_available(), first);

        let a = Libcrypto::get().map(|lib| lib as *const Libcrypto);
        let b = Libcrypto::get().map(|lib| lib as *const Libcrypto);
        assert_eq!(a, b);
    }

    #[test]
    fn test_loaded_library_reports_details() {
        let Some(lib) = Libcrypto::get() else {
            tracing::warn!("libcrypto not present on this host, skipping");
            return;
        };

        assert!(!lib.path().as_os_str().is_empty());
        if let Some(version) = lib.version() {
            assert!(version.contains("SSL"), "unexpected version {version}");
        }
        // A drain leaves the queue empty.
        let _ = lib.drain_errors();
        assert!(lib.drain_errors().is_empty());
    }
}
