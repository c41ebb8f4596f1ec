//! Constructors that hand out copies of a ready-made value

use serde::{Deserialize, Serialize};
use std::any::Any;

use crate::constructor::{CallFn, Constructor};
use crate::copy::{copy_value, CopyMode, Duplicate};
use crate::Result;

/// A constructor which just returns copies of a given value.
///
/// It does not take part in binding: it carries its own call, so
/// [`ConstructorExt::call`](crate::ConstructorExt::call) works on it directly
/// and binding it fails with `ReservedCallable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preconstructed<T> {
    value: T,
    #[serde(default = "deep")]
    copy_mode: CopyMode,
}

fn deep() -> CopyMode {
    CopyMode::Deep
}

impl<T: Duplicate> Preconstructed<T> {
    /// Hand out deep copies of `value`
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_copy_mode(value, CopyMode::Deep)
    }

    /// Hand out copies of `value` made with `copy_mode`
    #[must_use]
    pub fn with_copy_mode(value: T, copy_mode: CopyMode) -> Self {
        Self { value, copy_mode }
    }

    /// Same as [`Self::with_copy_mode`] with a textual mode
    ///
    /// # Errors
    ///
    /// Returns [`ConstructError::InvalidCopyMode`](crate::ConstructError::InvalidCopyMode)
    /// if `copy_mode` is not a known mode.
    pub fn with_copy_mode_named(value: T, copy_mode: &str) -> Result<Self> {
        Ok(Self::with_copy_mode(value, copy_mode.parse()?))
    }

    /// A fresh copy of the held value
    #[must_use]
    pub fn make(&self) -> T {
        copy_value(&self.value, self.copy_mode)
    }

    /// The held value
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Copy mode used by [`Self::make`]
    #[must_use]
    pub fn copy_mode(&self) -> CopyMode {
        self.copy_mode
    }
}

fn call_preconstructed<T>(this: &Preconstructed<T>) -> Box<dyn Any + Send>
where
    T: Duplicate + Send + Sync + 'static,
{
    Box::new(this.make())
}

impl<T> Constructor for Preconstructed<T>
where
    T: Duplicate + Send + Sync + 'static,
{
    fn own_call() -> Option<CallFn<Self>> {
        Some(call_preconstructed::<T> as CallFn<Self>)
    }
}

impl<T: Duplicate> Duplicate for Preconstructed<T> {
    fn alias(&self) -> Self {
        Self::with_copy_mode(self.value.alias(), self.copy_mode)
    }

    fn deep_copy(&self, memo: &mut crate::CopyMemo) -> Self {
        Self::with_copy_mode(self.value.deep_copy(memo), self.copy_mode)
    }
}
