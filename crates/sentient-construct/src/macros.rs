//! Declarative macros generating field-copy plans
//!
//! The field list of a constructor is fixed when the type is declared; these
//! macros turn it into the [`Duplicate`](crate::Duplicate),
//! [`Constructor`](crate::Constructor) and
//! [`ConstructedBy`](crate::ConstructedBy) impls the binding machinery needs.

/// Declare a constructor record.
///
/// Example:
/// ```
/// use sentient_construct::{constructor, Constructor};
///
/// constructor! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Size {
///         pub width: u32,
///         pub height: u32,
///     }
/// }
///
/// assert_eq!(Size::FIELDS, &["width", "height"]);
/// ```
#[macro_export]
macro_rules! constructor {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ftype:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ftype,
            )*
        }

        $crate::duplicate_fields!($name { $($field),* });

        impl $crate::Constructor for $name {
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];
        }
    };
}

/// Implement [`Duplicate`](crate::Duplicate) field by field for a struct.
///
/// A shallow copy of the struct aliases every field. When the struct is the
/// constructor being instantiated, [`copy_fields`](crate::Duplicate::copy_fields)
/// shallow-copies each field instead.
#[macro_export]
macro_rules! duplicate_fields {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl $crate::Duplicate for $name {
            fn alias(&self) -> Self {
                Self {
                    $($field: $crate::Duplicate::alias(&self.$field),)*
                }
            }

            #[allow(unused_variables)]
            fn deep_copy(&self, memo: &mut $crate::CopyMemo) -> Self {
                Self {
                    $($field: $crate::Duplicate::deep_copy(&self.$field, memo),)*
                }
            }

            fn copy_fields(&self, mode: $crate::CopyMode, memo: &mut $crate::CopyMemo) -> Self {
                match mode {
                    $crate::CopyMode::Shallow => Self {
                        $($field: $crate::Duplicate::shallow_copy(&self.$field),)*
                    },
                    _ => $crate::Duplicate::duplicate(self, mode, memo),
                }
            }
        }
    };
}

/// Implement [`ConstructedBy`](crate::ConstructedBy) for a target struct.
///
/// Fields listed before the `;` are moved over from the constructor under the
/// same name; fields after it start from `Default`. An optional `construct`
/// function becomes the post-construction hook.
///
/// Example:
/// ```
/// use sentient_construct::{bind, constructed_by, constructor, ConstructorExt, CopyMode};
///
/// constructor! {
///     pub struct GridCon {
///         pub width: u32,
///         pub height: u32,
///     }
/// }
///
/// pub struct Grid {
///     width: u32,
///     height: u32,
///     cells: Vec<u8>,
/// }
///
/// impl Grid {
///     fn fill(&mut self) {
///         self.cells = vec![0; (self.width * self.height) as usize];
///     }
/// }
///
/// constructed_by!(GridCon => Grid { width, height; cells }, construct = Grid::fill);
///
/// bind::<GridCon, Grid>(CopyMode::None).unwrap();
/// let grid: Grid = GridCon { width: 2, height: 3 }.build().unwrap();
/// assert_eq!(grid.cells.len(), 6);
/// ```
#[macro_export]
macro_rules! constructed_by {
    (
        $con:ty => $target:ident {
            $($field:ident),* $(,)?
            $(; $($raw:ident),* $(,)?)?
        }
        $(, construct = $hook:path)?
    ) => {
        impl $crate::ConstructedBy<$con> for $target {
            #[allow(unused_variables)]
            fn allocate(fields: $con) -> Self {
                Self {
                    $($field: fields.$field,)*
                    $($($raw: ::core::default::Default::default(),)*)?
                }
            }

            $(
                fn construct(&mut self) {
                    $hook(self)
                }
            )?
        }
    };
}
