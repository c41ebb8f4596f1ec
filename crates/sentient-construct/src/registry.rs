//! Binding registry
//!
//! Each constructor type may be bound to exactly one target type. Bindings
//! live in a registry keyed by the constructor's `TypeId`; the process-wide
//! registry backs [`bind`], [`instantiate`] and the [`ConstructorExt`]
//! methods, while local [`BindingRegistry`] values are handy for isolated
//! wiring and tests.
//!
//! [`ConstructorExt`]: crate::ConstructorExt

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{PoisonError, RwLock};

use crate::constructor::{instantiate_with, ConstructedBy, Constructor};
use crate::copy::{CopyMode, Duplicate};
use crate::error::short_type_name;
use crate::{ConstructError, Result};

type InstantiateFn = fn(&dyn Any, CopyMode) -> Option<Box<dyn Any + Send>>;

lazy_static::lazy_static! {
    static ref REGISTRY: RwLock<BindingRegistry> = RwLock::new(BindingRegistry::new());
}

/// Metadata recorded for one binding
#[derive(Clone)]
pub struct BindingRecord {
    constructor: String,
    target: String,
    target_id: TypeId,
    copy_mode: CopyMode,
    fields: &'static [&'static str],
    instantiate: InstantiateFn,
}

impl BindingRecord {
    /// Constructor type name
    #[must_use]
    pub fn constructor(&self) -> &str {
        &self.constructor
    }

    /// Target type name
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Copy mode applied on every instantiation
    #[must_use]
    pub fn copy_mode(&self) -> CopyMode {
        self.copy_mode
    }

    /// Fields copied from the constructor
    #[must_use]
    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    fn plan(&self) -> Plan {
        Plan {
            target_id: self.target_id,
            copy_mode: self.copy_mode,
            instantiate: self.instantiate,
        }
    }
}

impl fmt::Debug for BindingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRecord")
            .field("constructor", &self.constructor)
            .field("target", &self.target)
            .field("copy_mode", &self.copy_mode)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// What an invocation needs, copied out so no lock is held while user code runs
#[derive(Clone, Copy)]
struct Plan {
    target_id: TypeId,
    copy_mode: CopyMode,
    instantiate: InstantiateFn,
}

impl Plan {
    fn run<C: Constructor>(self, constructor: &C) -> Result<Box<dyn Any + Send>> {
        tracing::trace!(
            constructor = %short_type_name::<C>(),
            copy_mode = %self.copy_mode,
            "instantiating"
        );
        (self.instantiate)(constructor, self.copy_mode).ok_or_else(|| {
            ConstructError::UnboundConstructor {
                constructor: short_type_name::<C>(),
            }
        })
    }
}

fn instantiate_erased<C, T>(constructor: &dyn Any, mode: CopyMode) -> Option<Box<dyn Any + Send>>
where
    C: Constructor + Duplicate,
    T: ConstructedBy<C>,
{
    let constructor = constructor.downcast_ref::<C>()?;
    Some(Box::new(instantiate_with::<C, T>(constructor, mode)))
}

/// Typed handle returned by a successful binding
pub struct Binding<C, T> {
    copy_mode: CopyMode,
    _marker: PhantomData<fn(&C) -> T>,
}

impl<C, T> Binding<C, T>
where
    C: Constructor + Duplicate,
    T: ConstructedBy<C>,
{
    /// Build a target from `constructor`
    #[must_use]
    pub fn make(&self, constructor: &C) -> T {
        instantiate_with::<C, T>(constructor, self.copy_mode)
    }

    /// Copy mode this binding was made with
    #[must_use]
    pub fn copy_mode(&self) -> CopyMode {
        self.copy_mode
    }
}

impl<C, T> Clone for Binding<C, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, T> Copy for Binding<C, T> {}

impl<C, T> fmt::Debug for Binding<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("constructor", &short_type_name::<C>())
            .field("target", &short_type_name::<T>())
            .field("copy_mode", &self.copy_mode)
            .finish()
    }
}

/// Constructor-to-target bindings
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: HashMap<TypeId, BindingRecord>,
}

impl BindingRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Bind constructor `C` to target `T`.
    ///
    /// Fails if `C` is already bound or defines its own call; the registry
    /// is left untouched in both cases.
    ///
    /// # Errors
    ///
    /// [`ConstructError::DuplicateBinding`] if `C` is already bound and
    /// [`ConstructError::ReservedCallable`] if it defines its own call.
    pub fn bind<C, T>(&mut self, copy_mode: CopyMode) -> Result<Binding<C, T>>
    where
        C: Constructor + Duplicate,
        T: ConstructedBy<C>,
    {
        let key = TypeId::of::<C>();
        if let Some(existing) = self.bindings.get(&key) {
            return Err(ConstructError::DuplicateBinding {
                constructor: existing.constructor.clone(),
                existing: existing.target.clone(),
                attempted: short_type_name::<T>(),
            });
        }
        if C::own_call().is_some() {
            return Err(ConstructError::ReservedCallable {
                constructor: short_type_name::<C>(),
            });
        }

        let record = BindingRecord {
            constructor: short_type_name::<C>(),
            target: short_type_name::<T>(),
            target_id: TypeId::of::<T>(),
            copy_mode,
            fields: C::FIELDS,
            instantiate: instantiate_erased::<C, T>,
        };
        tracing::debug!(
            constructor = %record.constructor,
            target = %record.target,
            copy_mode = %copy_mode,
            fields = ?record.fields,
            "bound constructor"
        );
        self.bindings.insert(key, record);

        Ok(Binding {
            copy_mode,
            _marker: PhantomData,
        })
    }

    /// Bind with a textual copy mode, rejecting unknown modes before binding
    ///
    /// # Errors
    ///
    /// [`ConstructError::InvalidCopyMode`] for an unknown mode, otherwise as
    /// [`Self::bind`].
    pub fn bind_named<C, T>(&mut self, copy_mode: &str) -> Result<Binding<C, T>>
    where
        C: Constructor + Duplicate,
        T: ConstructedBy<C>,
    {
        let copy_mode = copy_mode.parse()?;
        self.bind::<C, T>(copy_mode)
    }

    /// Binding recorded for constructor `C`
    #[must_use]
    pub fn binding<C: Constructor>(&self) -> Option<&BindingRecord> {
        self.bindings.get(&TypeId::of::<C>())
    }

    /// Whether constructor `C` is bound
    #[must_use]
    pub fn is_bound<C: Constructor>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<C>())
    }

    /// All bindings, in no particular order
    pub fn records(&self) -> impl Iterator<Item = &BindingRecord> {
        self.bindings.values()
    }

    /// Number of bindings
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Invoke `constructor`
    ///
    /// # Errors
    ///
    /// [`ConstructError::UnboundConstructor`] if `C` is neither bound nor
    /// defines its own call.
    pub fn call<C: Constructor>(&self, constructor: &C) -> Result<Box<dyn Any + Send>> {
        match self.plan::<C>() {
            Some(plan) => plan.run(constructor),
            None => call_unbound(constructor),
        }
    }

    /// Invoke `constructor`, expecting a `T`
    ///
    /// # Errors
    ///
    /// As [`Self::call`], plus [`ConstructError::TargetMismatch`] if `C` does
    /// not produce a `T`. The mismatch is found before anything is built.
    pub fn build<C: Constructor, T: Any>(&self, constructor: &C) -> Result<T> {
        build_with(self.plan::<C>(), constructor)
    }

    fn plan<C: Constructor>(&self) -> Option<Plan> {
        self.binding::<C>().map(BindingRecord::plan)
    }
}

fn call_unbound<C: Constructor>(constructor: &C) -> Result<Box<dyn Any + Send>> {
    match C::own_call() {
        Some(call) => Ok(call(constructor)),
        None => Err(ConstructError::UnboundConstructor {
            constructor: short_type_name::<C>(),
        }),
    }
}

fn build_with<C: Constructor, T: Any>(plan: Option<Plan>, constructor: &C) -> Result<T> {
    let mismatch = || ConstructError::TargetMismatch {
        constructor: short_type_name::<C>(),
        requested: short_type_name::<T>(),
    };

    let built = match plan {
        Some(plan) if plan.target_id != TypeId::of::<T>() => return Err(mismatch()),
        Some(plan) => plan.run(constructor)?,
        None => call_unbound(constructor)?,
    };
    built.downcast::<T>().map(|b| *b).map_err(|_| mismatch())
}

/// Bind constructor `C` to target `T` in the process-wide registry
///
/// # Errors
///
/// See [`BindingRegistry::bind`].
pub fn bind<C, T>(copy_mode: CopyMode) -> Result<Binding<C, T>>
where
    C: Constructor + Duplicate,
    T: ConstructedBy<C>,
{
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .bind::<C, T>(copy_mode)
}

/// Bind with a textual copy mode in the process-wide registry
///
/// # Errors
///
/// See [`BindingRegistry::bind_named`].
pub fn bind_named<C, T>(copy_mode: &str) -> Result<Binding<C, T>>
where
    C: Constructor + Duplicate,
    T: ConstructedBy<C>,
{
    let copy_mode = copy_mode.parse()?;
    bind::<C, T>(copy_mode)
}

/// Whether constructor `C` is bound in the process-wide registry
#[must_use]
pub fn is_bound<C: Constructor>() -> bool {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_bound::<C>()
}

/// Name of the target constructor `C` is bound to
#[must_use]
pub fn bound_target<C: Constructor>() -> Option<String> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .binding::<C>()
        .map(|record| record.target.clone())
}

/// Binding record for constructor `C` in the process-wide registry
#[must_use]
pub fn binding<C: Constructor>() -> Option<BindingRecord> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .binding::<C>()
        .cloned()
}

fn global_plan<C: Constructor>() -> Option<Plan> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .plan::<C>()
}

/// Invoke `constructor` through the process-wide registry
///
/// # Errors
///
/// See [`BindingRegistry::call`].
pub fn instantiate<C: Constructor>(constructor: &C) -> Result<Box<dyn Any + Send>> {
    match global_plan::<C>() {
        Some(plan) => plan.run(constructor),
        None => call_unbound(constructor),
    }
}

/// Invoke `constructor` through the process-wide registry, expecting a `T`
///
/// # Errors
///
/// See [`BindingRegistry::build`].
pub fn instantiate_as<C: Constructor, T: Any>(constructor: &C) -> Result<T> {
    build_with(global_plan::<C>(), constructor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shared;

    #[derive(Debug, Clone)]
    struct SizeCon {
        width: u32,
        height: u32,
        tags: Shared<Vec<String>>,
    }

    impl SizeCon {
        fn new(width: u32) -> Self {
            Self {
                width,
                height: width,
                tags: Shared::default(),
            }
        }
    }

    crate::duplicate_fields!(SizeCon { width, height, tags });

    impl Constructor for SizeCon {
        const FIELDS: &'static [&'static str] = &["width", "height", "tags"];
    }

    #[derive(Debug)]
    struct Panel {
        width: u32,
        height: u32,
        tags: Shared<Vec<String>>,
        area: u32,
    }

    impl ConstructedBy<SizeCon> for Panel {
        fn allocate(fields: SizeCon) -> Self {
            Self {
                width: fields.width,
                height: fields.height,
                tags: fields.tags,
                area: 0,
            }
        }

        fn construct(&mut self) {
            self.area = self.width * self.height;
            self.tags.write().push("constructed".into());
        }
    }

    #[derive(Debug)]
    struct OtherPanel;

    impl ConstructedBy<SizeCon> for OtherPanel {
        fn allocate(_fields: SizeCon) -> Self {
            Self
        }
    }

    struct Custom;

    fn custom_call(_: &Custom) -> Box<dyn Any + Send> {
        Box::new("custom")
    }

    impl Constructor for Custom {
        fn own_call() -> Option<crate::CallFn<Self>> {
            Some(custom_call as crate::CallFn<Self>)
        }
    }

    impl Duplicate for Custom {
        fn alias(&self) -> Self {
            Self
        }

        fn deep_copy(&self, _memo: &mut crate::CopyMemo) -> Self {
            Self
        }
    }

    impl ConstructedBy<Custom> for OtherPanel {
        fn allocate(_fields: Custom) -> Self {
            Self
        }
    }

    #[test]
    fn test_bind_and_build() {
        let mut registry = BindingRegistry::new();
        registry.bind::<SizeCon, Panel>(CopyMode::Deep).unwrap();

        let panel: Panel = registry.build(&SizeCon::new(8)).unwrap();
        assert_eq!(panel.width, 8);
        assert_eq!(panel.height, 8);
        assert_eq!(panel.area, 64);

        let record = registry.binding::<SizeCon>().unwrap();
        assert_eq!(record.constructor(), "SizeCon");
        assert_eq!(record.target(), "Panel");
        assert_eq!(record.fields(), &["width", "height", "tags"]);
        assert_eq!(record.copy_mode(), CopyMode::Deep);
    }

    #[test]
    fn test_call_returns_exact_target_type() {
        let mut registry = BindingRegistry::new();
        registry.bind::<SizeCon, Panel>(CopyMode::None).unwrap();

        let built = registry.call(&SizeCon::new(2)).unwrap();
        assert!(built.is::<Panel>());
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let mut registry = BindingRegistry::new();
        registry.bind::<SizeCon, Panel>(CopyMode::None).unwrap();

        let err = registry.bind::<SizeCon, OtherPanel>(CopyMode::None).unwrap_err();
        match err {
            ConstructError::DuplicateBinding { constructor, existing, attempted } => {
                assert_eq!(constructor, "SizeCon");
                assert_eq!(existing, "Panel");
                assert_eq!(attempted, "OtherPanel");
            }
            other => panic!("unexpected error: {other}"),
        }

        // Same target again is still a second binding.
        assert!(matches!(
            registry.bind::<SizeCon, Panel>(CopyMode::Deep),
            Err(ConstructError::DuplicateBinding { .. })
        ));
        assert_eq!(registry.binding::<SizeCon>().unwrap().target(), "Panel");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reserved_callable_rejected() {
        let mut registry = BindingRegistry::new();
        let err = registry.bind::<Custom, OtherPanel>(CopyMode::None).unwrap_err();
        assert!(matches!(err, ConstructError::ReservedCallable { ref constructor } if constructor == "Custom"));
        assert!(!registry.is_bound::<Custom>());
        assert!(registry.is_empty());

        // Its own call still works.
        let out = registry.call(&Custom).unwrap();
        assert_eq!(*out.downcast::<&str>().unwrap(), "custom");
    }

    #[test]
    fn test_invalid_copy_mode_rejected_before_binding() {
        let mut registry = BindingRegistry::new();
        let err = registry.bind_named::<SizeCon, Panel>("sideways").unwrap_err();
        assert!(matches!(err, ConstructError::InvalidCopyMode(_)));
        assert!(!registry.is_bound::<SizeCon>());

        registry.bind_named::<SizeCon, Panel>("shallow").unwrap();
        assert_eq!(registry.binding::<SizeCon>().unwrap().copy_mode(), CopyMode::Shallow);
    }

    #[test]
    fn test_unbound_constructor() {
        let registry = BindingRegistry::new();
        let err = registry.call(&SizeCon::new(1)).unwrap_err();
        assert_eq!(err.to_string(), "SizeCon doesn't construct any type");
    }

    #[test]
    fn test_target_mismatch_checked_before_hook() {
        let mut registry = BindingRegistry::new();
        registry.bind::<SizeCon, Panel>(CopyMode::None).unwrap();

        let con = SizeCon::new(3);
        let err = registry.build::<SizeCon, OtherPanel>(&con).unwrap_err();
        assert!(matches!(err, ConstructError::TargetMismatch { .. }));
        // The hook would have tagged the shared list.
        assert!(con.tags.read().is_empty());
    }

    #[test]
    fn test_copy_mode_governs_aliasing() {
        let mut aliased = BindingRegistry::new();
        aliased.bind::<SizeCon, Panel>(CopyMode::None).unwrap();
        let con = SizeCon::new(1);
        let panel: Panel = aliased.build(&con).unwrap();
        assert!(panel.tags.ptr_eq(&con.tags));
        assert_eq!(con.tags.read().as_slice(), ["constructed"]);

        let mut copied = BindingRegistry::new();
        copied.bind::<SizeCon, Panel>(CopyMode::Deep).unwrap();
        let con = SizeCon::new(1);
        let panel: Panel = copied.build(&con).unwrap();
        assert!(!panel.tags.ptr_eq(&con.tags));
        assert!(con.tags.read().is_empty());
    }

    #[test]
    fn test_typed_binding_handle() {
        let mut registry = BindingRegistry::new();
        let binding = registry.bind::<SizeCon, Panel>(CopyMode::Shallow).unwrap();
        assert_eq!(binding.copy_mode(), CopyMode::Shallow);

        let con = SizeCon::new(4);
        let first = binding.make(&con);
        let second = binding.make(&con);
        assert_eq!(first.area, 16);
        assert!(!first.tags.ptr_eq(&second.tags));
        assert!(con.tags.read().is_empty());
    }
}
