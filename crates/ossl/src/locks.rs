// Copyright (C) Microsoft Corporation. All rights reserved.

//! Lock storage driven by libcrypto's locking callbacks.
//!
//! Acquire and release arrive as separate callback invocations, so these
//! are raw mutexes without guards. Pairing lock with unlock is the crypto
//! library's job; this module only checks bounds and handles.

use std::ffi::c_int;
use std::sync::Arc;

use parking_lot::lock_api::RawMutex as _;
use parking_lot::RawMutex;

use crate::error::*;
use crate::ffi::CRYPTO_LOCK;
use crate::handle_table::Handle;
use crate::handle_table::HandleTable;

/// Whether a callback `mode` asks for the lock to be taken.
pub(crate) fn is_lock_request(mode: c_int) -> bool {
    mode & CRYPTO_LOCK != 0
}

/// Fixed array of static locks, sized by `CRYPTO_num_locks`.
pub struct LockTable {
    locks: Box<[RawMutex]>,
}

impl LockTable {
    /// Allocates `count` unlocked mutexes.
    ///
    /// Allocation failure is reported, not aborted on, so the caller can
    /// decide how fatal it is.
    pub fn new(count: usize) -> CryptoResult<Self> {
        let mut locks = Vec::new();
        locks
            .try_reserve_exact(count)
            .map_err(|_| CryptoError::LockTableAllocation(count))?;
        locks.extend((0..count).map(|_| RawMutex::INIT));

        Ok(Self {
            locks: locks.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Blocks until lock `index` is held. Returns false for an index
    /// outside the table.
    pub fn lock(&self, index: usize) -> bool {
        match self.locks.get(index) {
            Some(lock) => {
                lock.lock();
                true
            }
            None => false,
        }
    }

    /// Releases lock `index`. Returns false for an index outside the table.
    ///
    /// # Safety
    /// The lock must be held by the current context.
    pub unsafe fn unlock(&self, index: usize) -> bool {
        match self.locks.get(index) {
            Some(lock) => {
                // SAFETY: the caller holds this lock.
                unsafe { lock.unlock() };
                true
            }
            None => false,
        }
    }

    /// Applies one locking callback request.
    ///
    /// # Safety
    /// An unlock request must name a lock the current context holds.
    pub(crate) unsafe fn apply(&self, mode: c_int, index: c_int) {
        let Ok(slot) = usize::try_from(index) else {
            tracing::error!(index, "locking callback with negative lock index");
            return;
        };

        let in_range = if is_lock_request(mode) {
            self.lock(slot)
        } else {
            // SAFETY: forwarded contract.
            unsafe { self.unlock(slot) }
        };

        if !in_range {
            tracing::error!(index, mode, len = self.len(), "lock index out of range");
        }
    }
}

/// A lock created on demand by libcrypto.
pub struct DynLock {
    raw: RawMutex,
}

/// Dynamic locks, addressed by handle.
#[derive(Default)]
pub struct DynLockTable {
    table: HandleTable<Arc<DynLock>>,
}

impl DynLockTable {
    /// Creates a new unlocked dynamic lock. `None` when the handle table
    /// cannot grow; the lock itself is an ordinary allocation and aborts on
    /// exhaustion like any other.
    pub fn create(&self) -> Option<Handle> {
        let handle = self.table.try_insert(Arc::new(DynLock {
            raw: RawMutex::INIT,
        }));
        if handle.is_none() {
            tracing::error!("could not allocate dynamic lock");
        }
        handle
    }

    /// Takes or releases the lock behind `handle` according to `mode`.
    ///
    /// # Safety
    /// An unlock request must name a lock the current context holds.
    pub unsafe fn apply(&self, mode: c_int, handle: Handle) -> CryptoResult<()> {
        let lock = self
            .table
            .get(handle)
            .ok_or(CryptoError::InvalidLockHandle(handle))?;

        if is_lock_request(mode) {
            lock.raw.lock();
        } else {
            // SAFETY: forwarded contract.
            unsafe { lock.raw.unlock() };
        }
        Ok(())
    }

    /// Destroys the lock behind `handle`. A second destroy of the same handle
    /// fails instead of touching freed state.
    pub fn destroy(&self, handle: Handle) -> CryptoResult<()> {
        let lock = self
            .table
            .remove(handle)
            .ok_or(CryptoError::InvalidLockHandle(handle))?;

        if lock.raw.is_locked() {
            tracing::warn!(handle, "destroying a dynamic lock that is still held");
        }
        Ok(())
    }

    /// Number of live dynamic locks.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::thread;

    use test_with_tracing::test;

    use super::*;
    use crate::ffi::CRYPTO_READ;
    use crate::ffi::CRYPTO_UNLOCK;
    use crate::ffi::CRYPTO_WRITE;

    #[test]
    fn test_lock_table_size() {
        let table = LockTable::new(41).expect("allocate");
        assert_eq!(table.len(), 41);
        assert!(!table.is_empty());

        let empty = LockTable::new(0).expect("allocate");
        assert!(empty.is_empty());
    }

    #[test]
    fn test_lock_table_huge_allocation_fails() {
        let result = LockTable::new(usize::MAX);
        assert_eq!(result.err(), Some(CryptoError::LockTableAllocation(usize::MAX)));
    }

    #[test]
    fn test_lock_table_bounds() {
        let table = LockTable::new(2).expect("allocate");
        assert!(table.lock(1));
        // SAFETY: lock 1 is held by this thread.
        assert!(unsafe { table.unlock(1) });

        assert!(!table.lock(2));
        // SAFETY: out of range, nothing is unlocked.
        assert!(!unsafe { table.unlock(2) });
    }

    #[test]
    fn test_lock_table_apply_modes() {
        let table = LockTable::new(4).expect("allocate");

        // SAFETY: every unlock follows the matching lock on this thread.
        unsafe {
            table.apply(CRYPTO_LOCK | CRYPTO_WRITE, 3);
            table.apply(CRYPTO_UNLOCK | CRYPTO_WRITE, 3);
            table.apply(CRYPTO_LOCK | CRYPTO_READ, 0);
            table.apply(CRYPTO_UNLOCK | CRYPTO_READ, 0);

            // Ignored, and must not panic.
            table.apply(CRYPTO_LOCK, -1);
            table.apply(CRYPTO_LOCK, 4);
        }

        // Both locks are free again.
        assert!(table.lock(3));
        assert!(table.lock(0));
    }

    #[test]
    fn test_lock_table_excludes_threads() {
        let table = Arc::new(LockTable::new(1).expect("allocate"));
        let inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                let inside = inside.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        // SAFETY: taking a lock has no precondition.
                        unsafe { table.apply(CRYPTO_LOCK, 0) };
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                        // SAFETY: this thread took lock 0 above.
                        unsafe { table.apply(CRYPTO_UNLOCK, 0) };
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().expect("worker panicked");
        }
    }

    #[test]
    fn test_dynlock_lifecycle() {
        let table = DynLockTable::default();
        let handle = table.create().expect("create");
        assert_ne!(handle, 0);
        assert_eq!(table.len(), 1);

        // SAFETY: unlock follows lock on this thread.
        unsafe {
            table.apply(CRYPTO_LOCK, handle).expect("lock");
            table.apply(CRYPTO_UNLOCK, handle).expect("unlock");
        }

        table.destroy(handle).expect("destroy");
        assert!(table.is_empty());
    }

    #[test]
    fn test_dynlock_double_destroy_detected() {
        let table = DynLockTable::default();
        let handle = table.create().expect("create");

        assert!(table.destroy(handle).is_ok());
        assert_eq!(
            table.destroy(handle),
            Err(CryptoError::InvalidLockHandle(handle))
        );
    }

    #[test]
    fn test_dynlock_unknown_handle() {
        let table = DynLockTable::default();
        // SAFETY: the handle is unknown, nothing is locked.
        let result = unsafe { table.apply(CRYPTO_LOCK, 12345) };
        assert_eq!(result, Err(CryptoError::InvalidLockHandle(12345)));
    }

    #[test]
    fn test_dynlocks_are_independent() {
        let table = DynLockTable::default();
        let a = table.create().expect("create a");
        let b = table.create().expect("create b");

        // SAFETY: both unlocks follow their locks on this thread.
        unsafe {
            table.apply(CRYPTO_LOCK, a).expect("lock a");
            // Would deadlock if a and b shared a mutex.
            table.apply(CRYPTO_LOCK, b).expect("lock b");
            table.apply(CRYPTO_UNLOCK, b).expect("unlock b");
            table.apply(CRYPTO_UNLOCK, a).expect("unlock a");
        }
    }
}
