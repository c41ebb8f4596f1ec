//! Copy modes and the duplication trait used when populating targets

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::{ConstructError, Result};

/// How field values are duplicated when copied into a new instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Alias the original values
    #[default]
    None,
    /// Duplicate each top-level container, alias what it holds
    Shallow,
    /// Duplicate the whole reachable value graph
    Deep,
}

impl CopyMode {
    /// Lowercase name of the mode
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Shallow => "shallow",
            Self::Deep => "deep",
        }
    }
}

impl fmt::Display for CopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CopyMode {
    type Err = ConstructError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "none" => Ok(Self::None),
            "shallow" => Ok(Self::Shallow),
            "deep" => Ok(Self::Deep),
            other => Err(ConstructError::InvalidCopyMode(other.to_string())),
        }
    }
}

/// Copies already made during one deep copy, keyed by source address.
///
/// Revisiting a source hands back the copy made the first time, which keeps
/// sharing intact and lets cyclic graphs terminate.
#[derive(Default)]
pub struct CopyMemo {
    copies: HashMap<usize, Box<dyn Any + Send>>,
}

impl CopyMemo {
    /// Create an empty memo
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy previously recorded for the source at `addr`
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, addr: usize) -> Option<T> {
        self.copies
            .get(&addr)
            .and_then(|copy| copy.downcast_ref::<T>())
            .cloned()
    }

    /// Record the copy made for the source at `addr`
    pub fn insert<T: Send + 'static>(&mut self, addr: usize, copy: T) {
        self.copies.insert(addr, Box::new(copy));
    }

    /// Number of recorded copies
    #[must_use]
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    /// Whether nothing has been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }
}

impl fmt::Debug for CopyMemo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyMemo")
            .field("copies", &self.copies.len())
            .finish()
    }
}

/// Values that can be copied under every [`CopyMode`].
///
/// Plain owned values behave the same in every mode. The modes only differ
/// for values holding shared handles such as [`crate::Shared`].
pub trait Duplicate: Sized {
    /// A value sharing every shared handle with `self`
    fn alias(&self) -> Self;

    /// A fresh copy of this value alone; everything it refers to is aliased.
    ///
    /// For an owned record or collection that is the same as [`Self::alias`].
    /// Only shared handles get a new top-level container.
    fn shallow_copy(&self) -> Self {
        self.alias()
    }

    /// A value sharing nothing with `self`
    fn deep_copy(&self, memo: &mut CopyMemo) -> Self;

    /// Copy according to `mode`
    fn duplicate(&self, mode: CopyMode, memo: &mut CopyMemo) -> Self {
        match mode {
            CopyMode::None => self.alias(),
            CopyMode::Shallow => self.shallow_copy(),
            CopyMode::Deep => self.deep_copy(memo),
        }
    }

    /// Copy the fields of a constructor into the value a target is built from.
    ///
    /// Under [`CopyMode::Shallow`] each field is shallow-copied on its own, so
    /// a field holding a shared container gets a fresh container while values
    /// nested below it stay aliased. Other modes match [`Self::duplicate`].
    /// Field-wise impls override this; the default copies the value whole.
    fn copy_fields(&self, mode: CopyMode, memo: &mut CopyMemo) -> Self {
        self.duplicate(mode, memo)
    }
}

/// Copy a single value with a fresh memo
#[must_use]
pub fn copy_value<T: Duplicate>(value: &T, mode: CopyMode) -> T {
    value.duplicate(mode, &mut CopyMemo::new())
}

macro_rules! duplicate_by_clone {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Duplicate for $ty {
                fn alias(&self) -> Self {
                    self.clone()
                }

                fn deep_copy(&self, _memo: &mut CopyMemo) -> Self {
                    self.clone()
                }
            }
        )*
    };
}

duplicate_by_clone!(
    (), bool, char, String,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
);

impl<T: Duplicate> Duplicate for Option<T> {
    fn alias(&self) -> Self {
        self.as_ref().map(Duplicate::alias)
    }

    fn shallow_copy(&self) -> Self {
        self.as_ref().map(Duplicate::shallow_copy)
    }

    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        self.as_ref().map(|v| v.deep_copy(memo))
    }
}

impl<T: Duplicate> Duplicate for Box<T> {
    fn alias(&self) -> Self {
        Box::new(self.as_ref().alias())
    }

    fn shallow_copy(&self) -> Self {
        Box::new(self.as_ref().shallow_copy())
    }

    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        Box::new(self.as_ref().deep_copy(memo))
    }
}

// An owned collection is its own top-level container, so a shallow copy
// aliases its elements.
impl<T: Duplicate> Duplicate for Vec<T> {
    fn alias(&self) -> Self {
        self.iter().map(Duplicate::alias).collect()
    }

    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        self.iter().map(|v| v.deep_copy(memo)).collect()
    }
}

impl<K, V, S> Duplicate for HashMap<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Duplicate,
    S: std::hash::BuildHasher + Default,
{
    fn alias(&self) -> Self {
        self.iter().map(|(k, v)| (k.clone(), v.alias())).collect()
    }

    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        self.iter()
            .map(|(k, v)| (k.clone(), v.deep_copy(memo)))
            .collect()
    }
}

impl<K: Clone + Ord, V: Duplicate> Duplicate for BTreeMap<K, V> {
    fn alias(&self) -> Self {
        self.iter().map(|(k, v)| (k.clone(), v.alias())).collect()
    }

    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        self.iter()
            .map(|(k, v)| (k.clone(), v.deep_copy(memo)))
            .collect()
    }
}

impl<K, V, S> Duplicate for IndexMap<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Duplicate,
    S: std::hash::BuildHasher + Default,
{
    fn alias(&self) -> Self {
        self.iter().map(|(k, v)| (k.clone(), v.alias())).collect()
    }

    fn deep_copy(&self, memo: &mut CopyMemo) -> Self {
        self.iter()
            .map(|(k, v)| (k.clone(), v.deep_copy(memo)))
            .collect()
    }
}
