// Copyright (C) Microsoft Corporation. All rights reserved.

use std::collections::HashMap;
use std::sync::atomic::*;

use parking_lot::RwLock;

/// A handle to an object. Never 0.
pub type Handle = usize;

/// A table of objects indexed by handle.
pub struct HandleTable<T: Clone> {
    table: RwLock<HashMap<Handle, T>>,
    next_handle: AtomicUsize,
}

impl<T: Clone> Default for HandleTable<T> {
    /// Returns an empty table whose first handle is 1.
    fn default() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
            next_handle: AtomicUsize::new(1),
        }
    }
}

impl<T: Clone> HandleTable<T> {
    /// Inserts an object into the table and returns a handle to it.
    ///
    /// # Arguments
    ///
    /// * `object` - The object to insert.
    ///
    /// # Returns
    ///
    /// A handle to the object, or `None` if the table could not grow.
    pub fn try_insert(&self, object: T) -> Option<Handle> {
        // Handles start at 1 and advance by 2, so they stay odd and can
        // never be confused with a null pointer once they cross into C.
        let handle = self.next_handle.fetch_add(2, Ordering::Relaxed);

        let mut table = self.table.write();
        table.try_reserve(1).ok()?;
        table.insert(handle, object);

        Some(handle)
    }

    /// Removes an object from the table and returns it.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle of the object to remove.
    ///
    /// # Returns
    ///
    /// The removed object, or `None` if the handle was not in the table.
    pub fn remove(&self, handle: Handle) -> Option<T> {
        self.table.write().remove(&handle)
    }

    /// Returns the object associated with the handle.
    ///
    /// # Arguments
    ///
    /// * `handle` - The handle of the object to retrieve.
    pub fn get(&self, handle: Handle) -> Option<T> {
        self.table.read().get(&handle).cloned()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Whether the table holds no objects.
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;

    #[test]
    fn test_handles_are_odd_and_unique() {
        let table = HandleTable::<u32>::default();
        let a = table.try_insert(10).expect("insert a");
        let b = table.try_insert(20).expect("insert b");

        assert_ne!(a, 0);
        assert_ne!(a, b);
        assert_eq!(a % 2, 1);
        assert_eq!(b % 2, 1);
        assert_eq!(table.get(a), Some(10));
        assert_eq!(table.get(b), Some(20));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_remove_is_reported_once() {
        let table = HandleTable::<&'static str>::default();
        let handle = table.try_insert("lock").expect("insert");

        assert_eq!(table.remove(handle), Some("lock"));
        assert_eq!(table.remove(handle), None);
        assert_eq!(table.get(handle), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_handles_are_not_reused() {
        let table = HandleTable::<u8>::default();
        let first = table.try_insert(1).expect("insert");
        table.remove(first);
        let second = table.try_insert(2).expect("insert");

        assert_ne!(first, second);
        assert_eq!(table.get(first), None);
    }
}
