//! Error types for constructor binding

use thiserror::Error;

/// Core error type for binding and construction
#[derive(Error, Debug)]
pub enum ConstructError {
    /// The constructor type is already bound to a target
    #[error("{constructor} cannot construct {attempted}, since it is already a constructor for {existing}")]
    DuplicateBinding {
        /// Constructor type name
        constructor: String,
        /// Target it is already bound to
        existing: String,
        /// Target the rejected binding asked for
        attempted: String,
    },

    /// The constructor type defines its own call
    #[error("{constructor} cannot be a constructor, since it already defines its own call")]
    ReservedCallable {
        /// Constructor type name
        constructor: String,
    },

    /// An unbound constructor was invoked
    #[error("{constructor} doesn't construct any type")]
    UnboundConstructor {
        /// Constructor type name
        constructor: String,
    },

    /// Unrecognised copy mode
    #[error("Invalid copy mode `{0}`, expected one of: none, shallow, deep")]
    InvalidCopyMode(String),

    /// A typed build asked for something the constructor does not produce
    #[error("{constructor} does not construct {requested}")]
    TargetMismatch {
        /// Constructor type name
        constructor: String,
        /// Requested target type name
        requested: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConstructError {
    /// Whether this error comes from wiring a constructor to a target
    /// (as opposed to moving constructor values around).
    #[must_use]
    pub fn is_binding_error(&self) -> bool {
        !matches!(self, Self::Serialization(_))
    }
}

/// Result type alias for construction operations
pub type Result<T> = std::result::Result<T, ConstructError>;

/// Short, path-free name of a type, e.g. `Vec<Shared<i64>>`.
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    strip_paths(std::any::type_name::<T>())
}

fn strip_paths(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
        } else {
            out.push(c);
            if !(c.is_alphanumeric() || c == '_') {
                segment_start = out.len();
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_paths() {
        assert_eq!(strip_paths("Foo"), "Foo");
        assert_eq!(strip_paths("a::b::Foo"), "Foo");
        assert_eq!(
            strip_paths("alloc::vec::Vec<sentient_construct::shared::Shared<i64>>"),
            "Vec<Shared<i64>>"
        );
        assert_eq!(
            strip_paths("std::collections::HashMap<alloc::string::String, u8>"),
            "HashMap<String, u8>"
        );
    }

    #[test]
    fn test_duplicate_binding_message_names_both_targets() {
        let err = ConstructError::DuplicateBinding {
            constructor: "RepeatedCon".into(),
            existing: "FirstEnv".into(),
            attempted: "SecondEnv".into(),
        };
        assert_eq!(
            err.to_string(),
            "RepeatedCon cannot construct SecondEnv, since it is already a constructor for FirstEnv"
        );
        assert!(err.is_binding_error());
    }
}
