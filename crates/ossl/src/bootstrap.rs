// Copyright (C) Microsoft Corporation. All rights reserved.

//! Thread-safety bootstrap for libcrypto.
//!
//! Older libcrypto releases are not safe to call from several threads until
//! the embedder supplies locks: a table of `CRYPTO_num_locks()` static locks,
//! a thread identity function, and create/lock/destroy callbacks for dynamic
//! locks. [`init_thread_safety`] provides all of them once per process.
//! Releases from 1.1.0 on lock internally and export none of the setters;
//! for those the bootstrap is a logged no-op.
//!
//! The callbacks run on arbitrary threads for the rest of the process, so
//! none of them may unwind into libcrypto.

use std::ffi::c_char;
use std::ffi::c_int;
use std::ffi::c_ulong;
use std::hint::black_box;
use std::panic::catch_unwind;
use std::process::abort;
use std::ptr::null_mut;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Once;
use std::sync::OnceLock;

use lazy_static::lazy_static;

use crate::error::*;
use crate::ffi::*;
use crate::handle_table::Handle;
use crate::library::Libcrypto;
use crate::library::LockingHooks;
use crate::library::ThreadIdHook;
use crate::locks::DynLockTable;
use crate::locks::LockTable;

/// Static locks. Allocated on the first install and never freed; libcrypto
/// may call into them until the process exits.
static LOCK_TABLE: OnceLock<LockTable> = OnceLock::new();

static INSTALL_CALLBACKS: Once = Once::new();

lazy_static! {
    static ref DYN_LOCKS: DynLockTable = DynLockTable::default();
}

/// Outcome of [`init_thread_safety`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadSafety {
    /// The embedder is single threaded, nothing was installed.
    Disabled,
    /// libcrypto is not loaded.
    Unavailable,
    /// libcrypto does its own locking.
    LibraryManaged,
    /// Callbacks are installed over a table of `locks` static locks.
    Installed { locks: usize },
}

/// Prepares libcrypto for use from several threads.
///
/// With `enable` false this does nothing. Otherwise the lock table is
/// allocated and the callback set installed, once; later calls report the
/// existing installation without allocating again. Failing to allocate the
/// lock table aborts the process, since libcrypto cannot then be used safely.
pub fn init_thread_safety(enable: bool) -> ThreadSafety {
    if !enable {
        tracing::debug!("init_thread_safety: single threaded embedder, skipping");
        return ThreadSafety::Disabled;
    }

    let Some(lib) = Libcrypto::get() else {
        tracing::debug!("init_thread_safety: libcrypto unavailable, skipping");
        return ThreadSafety::Unavailable;
    };

    let Some(hooks) = lib.locking.as_ref() else {
        tracing::debug!("init_thread_safety: libcrypto locks internally");
        return ThreadSafety::LibraryManaged;
    };

    let table = LOCK_TABLE.get_or_init(|| allocate_lock_table(hooks));
    INSTALL_CALLBACKS.call_once(|| install_callbacks(hooks, table.len()));

    ThreadSafety::Installed { locks: table.len() }
}

fn allocate_lock_table(hooks: &LockingHooks) -> LockTable {
    // SAFETY: takes no arguments.
    let count = unsafe { (hooks.num_locks)() };
    let count = usize::try_from(count).unwrap_or(0);

    match LockTable::new(count) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!("init_thread_safety: {e}; cannot use libcrypto from several threads");
            eprintln!("hostshim: fatal: {e}; cannot use libcrypto from several threads");
            abort();
        }
    }
}

fn install_callbacks(hooks: &LockingHooks, locks: usize) {
    // SAFETY: each setter stores the given function pointer; the callbacks
    // match the prototypes libcrypto expects and live for the whole process.
    unsafe {
        match hooks.thread_id {
            Some(ThreadIdHook::ThreadId { set_callback, .. }) => {
                if set_callback(Some(thread_id_callback)) == 0 {
                    // Another thread-id callback was set first; it stays.
                    tracing::warn!("init_thread_safety: thread id callback already set");
                }
            }
            Some(ThreadIdHook::Legacy { set_callback }) => set_callback(Some(legacy_id_callback)),
            None => tracing::debug!("init_thread_safety: no thread id hook exported"),
        }

        (hooks.set_locking_callback)(Some(locking_callback));

        if let (Some(create), Some(lock), Some(destroy)) = (
            hooks.set_dynlock_create,
            hooks.set_dynlock_lock,
            hooks.set_dynlock_destroy,
        ) {
            create(Some(dynlock_create_callback));
            lock(Some(dynlock_lock_callback));
            destroy(Some(dynlock_destroy_callback));
        } else {
            tracing::debug!("init_thread_safety: no dynamic lock hooks exported");
        }
    }

    tracing::info!(locks, "libcrypto locking callbacks installed");
}

/// Stable numeric id of the calling thread, unique for the process.
fn current_thread_id() -> c_ulong {
    static NEXT_THREAD_ID: AtomicUsize = AtomicUsize::new(1);

    thread_local! {
        static THREAD_ID: c_ulong = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed) as c_ulong;
    }

    THREAD_ID.try_with(|id| *id).unwrap_or_else(|_| stack_address_id())
}

/// Id for a thread whose locals are already torn down: the address of a
/// local on its own stack. Distinct among live threads, and far above the
/// counter ids.
fn stack_address_id() -> c_ulong {
    let marker = 0u8;
    black_box(&marker) as *const u8 as usize as c_ulong
}

/// Stores the calling thread's id in the THREADID libcrypto passed in.
///
/// # Safety
/// `id` must be valid for `set_numeric`.
unsafe fn fill_thread_id(set_numeric: CryptoThreadIdSetNumericFn, id: *mut CRYPTO_THREADID) {
    // SAFETY: forwarded contract.
    unsafe { set_numeric(id, current_thread_id()) };
}

fn handle_to_ptr(handle: Handle) -> *mut CRYPTO_dynlock_value {
    handle as *mut CRYPTO_dynlock_value
}

fn ptr_to_handle(ptr: *mut CRYPTO_dynlock_value) -> Handle {
    ptr as Handle
}

/// `CRYPTO_set_locking_callback` target
pub(crate) extern "C" fn locking_callback(
    mode: c_int,
    index: c_int,
    _file: *const c_char,
    _line: c_int,
) {
    on_unwind_abort(|| {
        if let Some(table) = LOCK_TABLE.get() {
            // SAFETY: libcrypto only unlocks locks it took on this thread.
            unsafe { table.apply(mode, index) };
        }
    })
}

/// `CRYPTO_THREADID_set_callback` target
pub(crate) extern "C" fn thread_id_callback(id: *mut CRYPTO_THREADID) {
    on_unwind_abort(|| {
        let Some(ThreadIdHook::ThreadId { set_numeric, .. }) = Libcrypto::get()
            .and_then(|lib| lib.locking.as_ref())
            .and_then(|hooks| hooks.thread_id)
        else {
            return;
        };

        // SAFETY: `id` is the THREADID libcrypto asked us to fill.
        unsafe { fill_thread_id(set_numeric, id) };
    })
}

/// `CRYPTO_set_id_callback` target
pub(crate) extern "C" fn legacy_id_callback() -> c_ulong {
    on_unwind_abort(current_thread_id)
}

/// `CRYPTO_set_dynlock_create_callback` target. Returns null when the handle
/// table cannot grow.
pub(crate) extern "C" fn dynlock_create_callback(
    _file: *const c_char,
    _line: c_int,
) -> *mut CRYPTO_dynlock_value {
    catch_unwind(|| DYN_LOCKS.create().map_or(null_mut(), handle_to_ptr)).unwrap_or(null_mut())
}

/// `CRYPTO_set_dynlock_lock_callback` target
pub(crate) extern "C" fn dynlock_lock_callback(
    mode: c_int,
    lock: *mut CRYPTO_dynlock_value,
    _file: *const c_char,
    _line: c_int,
) {
    on_unwind_abort(|| {
        let handle = ptr_to_handle(lock);
        // SAFETY: libcrypto only unlocks dynamic locks it took on this thread.
        if let Err(e) = unsafe { DYN_LOCKS.apply(mode, handle) } {
            tracing::error!(mode, "dynlock lock callback: {e}");
        }
    })
}

/// `CRYPTO_set_dynlock_destroy_callback` target
pub(crate) extern "C" fn dynlock_destroy_callback(
    lock: *mut CRYPTO_dynlock_value,
    _file: *const c_char,
    _line: c_int,
) {
    on_unwind_abort(|| {
        if let Err(e) = DYN_LOCKS.destroy(ptr_to_handle(lock)) {
            tracing::error!("dynlock destroy callback: {e}");
        }
    })
}
