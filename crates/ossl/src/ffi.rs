// Copyright (C) Microsoft Corporation. All rights reserved.
// Portions of this file derived from OpenSSL
// References: include/openssl/crypto.h, include/openssl/evp.h, include/openssl/err.h

//! libcrypto declarations resolved at load time.
//!
//! Nothing here is linked; every function type is looked up by name in the
//! dynamically loaded library.

#![allow(non_camel_case_types)]

use std::ffi::c_char;
use std::ffi::c_int;
use std::ffi::c_uint;
use std::ffi::c_ulong;
use std::ffi::c_void;

/// Opaque `EVP_MD_CTX`
#[repr(C)]
pub struct EVP_MD_CTX {
    _private: [u8; 0],
}

/// Opaque `EVP_MD`
#[repr(C)]
pub struct EVP_MD {
    _private: [u8; 0],
}

/// Opaque `CRYPTO_THREADID`
#[repr(C)]
pub struct CRYPTO_THREADID {
    _private: [u8; 0],
}

/// Opaque `struct CRYPTO_dynlock_value`. Pointers of this type carry
/// dynamic-lock handles, they never point at memory.
#[repr(C)]
pub struct CRYPTO_dynlock_value {
    _private: [u8; 0],
}

pub const CRYPTO_LOCK: c_int = 1;
pub const CRYPTO_UNLOCK: c_int = 2;
pub const CRYPTO_READ: c_int = 4;
pub const CRYPTO_WRITE: c_int = 8;

pub const EVP_MAX_MD_SIZE: usize = 64;

pub const OPENSSL_INIT_LOAD_CRYPTO_STRINGS: u64 = 0x0000_0002;
pub const OPENSSL_INIT_ADD_ALL_DIGESTS: u64 = 0x0000_0008;

/// `OPENSSL_VERSION` / `SSLEAY_VERSION` selector
pub const OPENSSL_VERSION: c_int = 0;

// EVP digests
pub type EvpMdCtxNewFn = unsafe extern "C" fn() -> *mut EVP_MD_CTX;
pub type EvpMdCtxFreeFn = unsafe extern "C" fn(*mut EVP_MD_CTX);
pub type EvpGetDigestByNameFn = unsafe extern "C" fn(*const c_char) -> *const EVP_MD;
pub type EvpMdSizeFn = unsafe extern "C" fn(*const EVP_MD) -> c_int;
pub type EvpDigestInitExFn =
    unsafe extern "C" fn(*mut EVP_MD_CTX, *const EVP_MD, *mut c_void) -> c_int;
pub type EvpDigestUpdateFn = unsafe extern "C" fn(*mut EVP_MD_CTX, *const c_void, usize) -> c_int;
pub type EvpDigestFinalExFn = unsafe extern "C" fn(*mut EVP_MD_CTX, *mut u8, *mut c_uint) -> c_int;

// Library init, version and error queue
pub type OpensslInitCryptoFn = unsafe extern "C" fn(u64, *const c_void) -> c_int;
pub type OpensslAddAllDigestsFn = unsafe extern "C" fn();
pub type OpensslVersionFn = unsafe extern "C" fn(c_int) -> *const c_char;
pub type ErrGetErrorFn = unsafe extern "C" fn() -> c_ulong;
pub type ErrErrorStringNFn = unsafe extern "C" fn(c_ulong, *mut c_char, usize);

// Callbacks implemented by this crate
pub type LockingCallback = extern "C" fn(c_int, c_int, *const c_char, c_int);
pub type ThreadIdCallback = extern "C" fn(*mut CRYPTO_THREADID);
pub type LegacyIdCallback = extern "C" fn() -> c_ulong;
pub type DynlockCreateCallback = extern "C" fn(*const c_char, c_int) -> *mut CRYPTO_dynlock_value;
pub type DynlockLockCallback =
    extern "C" fn(c_int, *mut CRYPTO_dynlock_value, *const c_char, c_int);
pub type DynlockDestroyCallback = extern "C" fn(*mut CRYPTO_dynlock_value, *const c_char, c_int);

// Locking hooks, exported only by libcrypto 1.0.x and older
pub type CryptoNumLocksFn = unsafe extern "C" fn() -> c_int;
pub type CryptoSetLockingCallbackFn = unsafe extern "C" fn(Option<LockingCallback>);
pub type CryptoThreadIdSetCallbackFn = unsafe extern "C" fn(Option<ThreadIdCallback>) -> c_int;
pub type CryptoThreadIdSetNumericFn = unsafe extern "C" fn(*mut CRYPTO_THREADID, c_ulong);
pub type CryptoSetIdCallbackFn = unsafe extern "C" fn(Option<LegacyIdCallback>);
pub type CryptoSetDynlockCreateCallbackFn = unsafe extern "C" fn(Option<DynlockCreateCallback>);
pub type CryptoSetDynlockLockCallbackFn = unsafe extern "C" fn(Option<DynlockLockCallback>);
pub type CryptoSetDynlockDestroyCallbackFn = unsafe extern "C" fn(Option<DynlockDestroyCallback>);
