//! Constructor and target traits
//!
//! A constructor is a plain configuration record. A target is the type it
//! builds. The two are tied together at runtime by [`crate::bind`], after
//! which invoking the constructor value produces a fresh target instance.

use std::any::Any;

use crate::copy::Duplicate;
use crate::registry;
use crate::Result;

/// Invocation behaviour a constructor type defines for itself
pub type CallFn<C> = fn(&C) -> Box<dyn Any + Send>;

/// Types whose values act as constructors.
///
/// The provided behaviour is the base marker: a type that implements this
/// trait, overrides nothing and is never bound fails invocation with
/// [`ConstructError::UnboundConstructor`](crate::ConstructError).
pub trait Constructor: Any + Send + Sync + Sized {
    /// Declared field names, in declaration order
    const FIELDS: &'static [&'static str] = &[];

    /// Invocation behaviour owned by the type itself.
    ///
    /// Types answering `Some` cannot be bound.
    fn own_call() -> Option<CallFn<Self>> {
        None
    }
}

/// Targets that can be built from constructor `C`
pub trait ConstructedBy<C>: Any + Send + Sized {
    /// Build an instance straight from (already copied) constructor fields.
    ///
    /// This is the raw allocation path; it must not run the type's usual
    /// constructor. Fields the constructor does not provide should start
    /// from their `Default`.
    fn allocate(fields: C) -> Self;

    /// Post-construction hook, run once all fields are populated
    fn construct(&mut self) {}
}

/// Two-phase construction: copy, allocate, then run the hook.
pub(crate) fn instantiate_with<C, T>(constructor: &C, mode: crate::CopyMode) -> T
where
    C: Duplicate,
    T: ConstructedBy<C>,
{
    let mut memo = crate::CopyMemo::new();
    let fields = constructor.copy_fields(mode, &mut memo);
    let mut instance = T::allocate(fields);
    instance.construct();
    instance
}

/// Invocation syntax for constructor values
pub trait ConstructorExt: Constructor {
    /// Invoke the constructor, producing whatever it builds
    ///
    /// # Errors
    ///
    /// [`ConstructError::UnboundConstructor`](crate::ConstructError::UnboundConstructor)
    /// if the type is not bound and has no call of its own.
    fn call(&self) -> Result<Box<dyn Any + Send>> {
        registry::instantiate(self)
    }

    /// Invoke the constructor, expecting a `T`
    ///
    /// # Errors
    ///
    /// As [`Self::call`], plus
    /// [`ConstructError::TargetMismatch`](crate::ConstructError::TargetMismatch)
    /// if the constructor does not produce a `T`.
    fn build<T: Any>(&self) -> Result<T> {
        registry::instantiate_as::<Self, T>(self)
    }

    /// Name of the target this constructor type is bound to
    #[must_use]
    fn constructs() -> Option<String> {
        registry::bound_target::<Self>()
    }
}

impl<C: Constructor> ConstructorExt for C {}
