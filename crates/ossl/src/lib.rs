// Copyright (C) Microsoft Corporation. All rights reserved.

//! Runtime binding to the host's libcrypto.
//!
//! The library is opened with [`libloading`] rather than linked, so a host
//! without libcrypto still runs; digests then fail with
//! [`CryptoError::EngineUnavailable`] instead of the process failing to start.
//!
//! Two services are built on the binding:
//!
//! - [`digest`]: SHA-1 and SHA-256 sessions over the EVP interface.
//! - [`bootstrap`]: the locking callbacks libcrypto 1.0.x needs before it can
//!   be used from several threads.

pub mod bootstrap;
pub mod digest;
pub mod error;
pub mod ffi;
pub mod handle_table;
pub mod library;
pub mod locks;

pub use bootstrap::init_thread_safety;
pub use bootstrap::ThreadSafety;
pub use digest::digest;
pub use digest::DigestAlgo;
pub use digest::DigestContext;
pub use error::CryptoError;
pub use error::CryptoResult;
pub use library::init_library;
pub use library::is_available;
pub use library::Libcrypto;
