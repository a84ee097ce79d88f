// Copyright (C) Microsoft Corporation. All rights reserved.

//! Digest sessions over libcrypto's EVP interface.
//!
//! A [`DigestContext`] owns exactly one `EVP_MD_CTX`. It is created bound to
//! an algorithm, fed with [`DigestContext::update`], and consumed by
//! [`DigestContext::finalize`]. The underlying context is freed by `Drop`,
//! which therefore runs exactly once: at the end of `finalize`, or when an
//! unfinished context is abandoned. Using a context after finalization is
//! rejected at compile time.
//!
//! # Supported Algorithms
//!
//! - **SHA-1**: 20-byte digest (legacy, still used for content addressing)
//! - **SHA-256**: 32-byte digest

use std::ffi::c_uint;
use std::ffi::c_void;
use std::ffi::CStr;
use std::fmt;
use std::ptr::null_mut;
use std::ptr::NonNull;
use std::str::FromStr;

use crate::engine_log;
use crate::error::*;
use crate::ffi::EVP_MAX_MD_SIZE;
use crate::ffi::EVP_MD;
use crate::ffi::EVP_MD_CTX;
use crate::library::Libcrypto;

/// Digest algorithms a session can be bound to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DigestAlgo {
    Sha1,
    Sha256,
}

impl DigestAlgo {
    /// Digest length in bytes.
    pub const fn size(self) -> usize {
        match self {
            DigestAlgo::Sha1 => 20,
            DigestAlgo::Sha256 => 32,
        }
    }

    /// Lowercase algorithm name.
    pub const fn name(self) -> &'static str {
        match self {
            DigestAlgo::Sha1 => "sha1",
            DigestAlgo::Sha256 => "sha256",
        }
    }

    fn engine_name(self) -> &'static CStr {
        // Built with from_bytes_with_nul so no literal syntax newer than the
        // crate's minimum toolchain is needed.
        let name: &'static [u8] = match self {
            DigestAlgo::Sha1 => b"SHA1\0",
            DigestAlgo::Sha256 => b"SHA256\0",
        };
        match CStr::from_bytes_with_nul(name) {
            Ok(name) => name,
            Err(_) => unreachable!("digest names are NUL terminated"),
        }
    }
}

impl fmt::Display for DigestAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgo {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("sha1") {
            Ok(DigestAlgo::Sha1)
        } else if s.eq_ignore_ascii_case("sha256") {
            Ok(DigestAlgo::Sha256)
        } else {
            Err(CryptoError::UnsupportedAlgorithm(s.to_string()))
        }
    }
}

/// One running hash computation.
pub struct DigestContext {
    lib: &'static Libcrypto,
    ctx: NonNull<EVP_MD_CTX>,
    algo: DigestAlgo,
    failed: bool,
}

// SAFETY: an EVP_MD_CTX is plain heap state with no thread affinity; it can
// move between threads as long as only one uses it at a time, which the
// missing `Sync` impl enforces.
unsafe impl Send for DigestContext {}

impl DigestContext {
    /// Starts a session for `algo`.
    ///
    /// Fails with [`CryptoError::EngineUnavailable`] when libcrypto is not
    /// loaded, does not provide the digest, or cannot allocate a session.
    pub fn new(algo: DigestAlgo) -> CryptoResult<Self> {
        let lib = Libcrypto::get().ok_or(CryptoError::EngineUnavailable)?;
        let fns = &lib.digest;

        // SAFETY: the name is NUL terminated; the result is a static table
        // entry or null.
        let md: *const EVP_MD = unsafe { (fns.get_digest_by_name)(algo.engine_name().as_ptr()) };
        if md.is_null() {
            engine_log!(
                lib,
                CryptoError::EngineUnavailable,
                tracing::Level::ERROR,
                "DigestContext::new: libcrypto does not provide {algo}",
            );
            Err(CryptoError::EngineUnavailable)?;
        }

        // SAFETY: `md` is a valid digest.
        let size = unsafe { (fns.md_size)(md) };
        if usize::try_from(size).ok() != Some(algo.size()) {
            engine_log!(
                lib,
                CryptoError::EngineUnavailable,
                tracing::Level::ERROR,
                "DigestContext::new: {algo} reports size {size}",
            );
            Err(CryptoError::EngineUnavailable)?;
        }

        // SAFETY: allocates a fresh context or returns null.
        let Some(ctx) = NonNull::new(unsafe { (fns.md_ctx_new)() }) else {
            engine_log!(
                lib,
                CryptoError::EngineUnavailable,
                tracing::Level::ERROR,
                "DigestContext::new: could not allocate EVP_MD_CTX",
            );
            return Err(CryptoError::EngineUnavailable);
        };

        // From here on, returning early frees `ctx` through Drop.
        let context = Self {
            lib,
            ctx,
            algo,
            failed: false,
        };

        // SAFETY: `ctx` and `md` are valid; a null ENGINE selects the default
        // implementation.
        let res = unsafe { (fns.digest_init_ex)(context.ctx.as_ptr(), md, null_mut()) };
        if res != 1 {
            engine_log!(
                lib,
                CryptoError::EngineUnavailable,
                tracing::Level::ERROR,
                "DigestContext::new: failed to init {algo} digest",
            );
            Err(CryptoError::EngineUnavailable)?;
        }

        tracing::trace!(%algo, "digest session started");
        Ok(context)
    }

    /// Starts a session for the algorithm called `name`.
    ///
    /// The name is checked before libcrypto is touched, so an unsupported
    /// algorithm never allocates anything.
    pub fn init(name: &str) -> CryptoResult<Self> {
        Self::new(name.parse()?)
    }

    /// The algorithm this session computes.
    pub fn algo(&self) -> DigestAlgo {
        self.algo
    }

    /// Feeds `data` into the running hash.
    ///
    /// A failure leaves the session unusable: every later call fails with
    /// [`CryptoError::EngineFailure`] without reaching libcrypto.
    pub fn update(&mut self, data: &[u8]) -> CryptoResult<()> {
        if self.failed {
            Err(CryptoError::EngineFailure)?;
        }

        // SAFETY: `ctx` is initialized and `data` is a valid slice.
        let res = unsafe {
            (self.lib.digest.digest_update)(
                self.ctx.as_ptr(),
                data.as_ptr() as *const c_void,
                data.len(),
            )
        };
        if res != 1 {
            self.failed = true;
            engine_log!(
                self.lib,
                CryptoError::EngineFailure,
                tracing::Level::ERROR,
                "DigestContext::update: failed to update {} digest",
                self.algo,
            );
            Err(CryptoError::EngineFailure)?;
        }
        Ok(())
    }

    /// Produces the digest and ends the session.
    pub fn finalize(self) -> CryptoResult<Vec<u8>> {
        if self.failed {
            Err(CryptoError::EngineFailure)?;
        }

        let mut digest = vec![0u8; EVP_MAX_MD_SIZE];
        let mut digest_len: c_uint = 0;
        // SAFETY: the buffer holds EVP_MAX_MD_SIZE bytes, the most any
        // digest writes.
        let res = unsafe {
            (self.lib.digest.digest_final_ex)(
                self.ctx.as_ptr(),
                digest.as_mut_ptr(),
                &mut digest_len,
            )
        };
        if res != 1 {
            engine_log!(
                self.lib,
                CryptoError::EngineFailure,
                tracing::Level::ERROR,
                "DigestContext::finalize: failed to finalize {} digest",
                self.algo,
            );
            Err(CryptoError::EngineFailure)?;
        }

        digest.truncate(digest_len as usize);
        if digest.len() != self.algo.size() {
            tracing::error!(
                algo = %self.algo,
                len = digest.len(),
                "DigestContext::finalize: unexpected digest length"
            );
            Err(CryptoError::EngineFailure)?;
        }

        tracing::trace!(algo = %self.algo, "digest session finalized");
        Ok(digest)
    }
}

impl Drop for DigestContext {
    fn drop(&mut self) {
        // SAFETY: `ctx` came from EVP_MD_CTX_new and is freed only here.
        unsafe { (self.lib.digest.md_ctx_free)(self.ctx.as_ptr()) };
    }
}

impl fmt::Debug for DigestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestContext")
            .field("algo", &self.algo)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

/// Hashes `data` in one call.
pub fn digest(algo: DigestAlgo, data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut context = DigestContext::new(algo)?;
    context.update(data)?;
    context.finalize()
}

#[cfg(test)]
mod tests;
