//! Constructor binding for SentientOS
//!
//! A constructor is a small, serializable record describing how to build
//! something; the thing it builds is its target. Binding ties a constructor
//! type to exactly one target type, after which invoking a constructor value
//! produces a fresh target whose fields were copied from the constructor.
//!
//! ```
//! use sentient_construct::{bind, constructed_by, constructor, ConstructorExt, CopyMode};
//!
//! constructor! {
//!     #[derive(Debug, Clone)]
//!     pub struct SizeCon {
//!         pub width: u32,
//!         pub height: u32,
//!     }
//! }
//!
//! impl SizeCon {
//!     pub fn new(width: u32) -> Self {
//!         Self { width, height: width }
//!     }
//! }
//!
//! pub struct Canvas {
//!     width: u32,
//!     height: u32,
//! }
//!
//! constructed_by!(SizeCon => Canvas { width, height });
//!
//! bind::<SizeCon, Canvas>(CopyMode::None)?;
//! let canvas: Canvas = SizeCon::new(8).build()?;
//! assert_eq!((canvas.width, canvas.height), (8, 8));
//! # Ok::<(), sentient_construct::ConstructError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constructor;
pub mod copy;
pub mod deploy;
pub mod error;
pub mod macros;
pub mod preconstructed;
pub mod record;
pub mod registry;
pub mod shared;

// Re-export core traits and types
pub use constructor::{CallFn, ConstructedBy, Constructor, ConstructorExt};
pub use copy::{copy_value, CopyMemo, CopyMode, Duplicate};
pub use deploy::{from_payload, to_payload, transport};
pub use error::{ConstructError, Result};
pub use preconstructed::Preconstructed;
pub use record::{FieldValue, Record};
pub use registry::{
    bind, bind_named, binding, bound_target, instantiate, instantiate_as, is_bound, Binding,
    BindingRecord, BindingRegistry,
};
pub use shared::{Shared, SharedMut, SharedRef};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        bind, bind_named, ConstructedBy, Constructor, ConstructorExt, CopyMode, Duplicate,
        Preconstructed, Result, Shared,
    };
}
