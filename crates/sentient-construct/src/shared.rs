//! Aliasable, interior-mutable values
//!
//! [`Shared`] is what gives copy modes an observable meaning: a constructor
//! field holding a `Shared` is aliased under [`CopyMode::None`](crate::CopyMode),
//! re-wrapped under `Shallow` and fully duplicated under `Deep`.
//!
//! Graphs of handles may be cyclic. Formatting and comparison track the
//! handles they are inside of on the current thread, so both terminate.

use serde::{ser, Deserialize, Deserializer, Serialize, Serializer};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::LocalKey;

use crate::copy::{CopyMemo, Duplicate};

/// Reference-counted, lock-protected value
pub struct Shared<T> {
    // Empty only while a deep copy is still filling the handle in.
    inner: Arc<RwLock<Option<T>>>,
}

/// Read access to a [`Shared`] value
pub struct SharedRef<'a, T> {
    guard: RwLockReadGuard<'a, Option<T>>,
}

/// Write access to a [`Shared`] value
pub struct SharedMut<'a, T> {
    guard: RwLockWriteGuard<'a, Option<T>>,
}

#[cold]
fn unfilled() -> ! {
    panic!("shared value accessed while its deep copy is still being made")
}

impl<T> Deref for SharedRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.guard.as_ref() {
            Some(value) => value,
            None => unfilled(),
        }
    }
}

impl<T> Deref for SharedMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.guard.as_ref() {
            Some(value) => value,
            None => unfilled(),
        }
    }
}

impl<T> DerefMut for SharedMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.guard.as_mut() {
            Some(value) => value,
            None => unfilled(),
        }
    }
}

impl<T> Shared<T> {
    /// Wrap a value
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(value))),
        }
    }

    /// Read access
    ///
    /// # Panics
    ///
    /// Panics if called on a handle a deep copy is still filling in, which
    /// only a [`Duplicate`] impl reading its own copy target can observe.
    #[must_use]
    pub fn read(&self) -> SharedRef<'_, T> {
        SharedRef { guard: self.slot() }
    }

    /// Write access
    ///
    /// # Panics
    ///
    /// Same as [`Self::read`].
    #[must_use]
    pub fn write(&self) -> SharedMut<'_, T> {
        SharedMut {
            guard: self.inner.write().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Replace the held value, returning the old one
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.write(), value)
    }

    /// Whether both handles point at the same value
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of handles to this value
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    fn slot(&self) -> RwLockReadGuard<'_, Option<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Address used as the memo key during deep copies
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner).cast::<()>() as usize
    }
}

impl<T: Clone> Shared<T> {
    /// Clone of the held value
    #[must_use]
    pub fn get(&self) -> T {
        self.read().clone()
    }
}

impl<T> Clone for Shared<T> {
    /// Another handle to the same value
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

thread_local! {
    static FORMATTING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
    static COMPARING: RefCell<HashSet<(usize, usize)>> = RefCell::new(HashSet::new());
}

/// Marks a key as in progress on this thread until dropped
struct Visit<K: Copy + Eq + Hash + 'static> {
    active: &'static LocalKey<RefCell<HashSet<K>>>,
    key: K,
}

impl<K: Copy + Eq + Hash + 'static> Visit<K> {
    /// `None` if `key` is already in progress
    fn enter(active: &'static LocalKey<RefCell<HashSet<K>>>, key: K) -> Option<Self> {
        active
            .with(|set| set.borrow_mut().insert(key))
            .then(|| Self { active, key })
    }
}

impl<K: Copy + Eq + Hash + 'static> Drop for Visit<K> {
    fn drop(&mut self) {
        self.active.with(|set| set.borrow_mut().remove(&self.key));
    }
}

impl<T: PartialEq> PartialEq for Shared<T> {
    /// Compares held values, not identity.
    ///
    /// A pair of handles met again while already being compared counts as
    /// equal, so cyclic graphs compare by structure.
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let Some(_visit) = Visit::enter(&COMPARING, (self.addr(), other.addr())) else {
            return true;
        };
        *self.slot() == *other.slot()
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(_visit) = Visit::enter(&FORMATTING, self.addr()) else {
            return f.write_str("Shared(..)");
        };
        match self.inner.try_read() {
            Ok(slot) => match slot.as_ref() {
                Some(value) => f.debug_tuple("Shared").field(value).finish(),
                None => f.write_str("Shared(<pending>)"),
            },
            Err(_) => f.write_str("Shared(<locked>)"),
        }
    }
}

impl<T> Duplicate for Shared<T>
where
    T: Duplicate + Send + Sync + 'static,
{
    fn alias(&self) -> Self {
        self.clone()
    }

    fn shallow_copy(&self) -> Self {
        Self::new(self.read().alias())
    }

    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        let addr = self.addr();
        if let Some(copy) = memo.get::<Self>(addr) {
            return copy;
        }

        // Registered empty before descending so cycles resolve to this copy.
        let copy = Self {
            inner: Arc::new(RwLock::new(None)),
        };
        memo.insert(addr, copy.clone());
        let value = self.read().deep_copy(memo);
        *copy.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
        copy
    }
}

impl<T: Serialize> Serialize for Shared<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.slot().as_ref() {
            Some(value) => value.serialize(serializer),
            None => Err(ser::Error::custom("shared value is still being copied")),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Shared<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        T::deserialize(deserializer).map(Self::new)
    }
}
