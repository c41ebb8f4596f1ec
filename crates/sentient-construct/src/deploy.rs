//! Value-based transport of constructor values
//!
//! Constructors are meant to be shipped to wherever the target gets built,
//! e.g. a worker process. Only field values travel: any aliasing between
//! shared handles inside the value is flattened on the way.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::short_type_name;
use crate::Result;

/// Serialize a constructor value into a JSON payload
///
/// # Errors
///
/// [`ConstructError::Serialization`](crate::ConstructError::Serialization)
/// if the value cannot be represented as JSON.
pub fn to_payload<C: Serialize>(constructor: &C) -> Result<String> {
    let payload = serde_json::to_string(constructor)?;
    tracing::trace!(
        constructor = %short_type_name::<C>(),
        bytes = payload.len(),
        "packed constructor"
    );
    Ok(payload)
}

/// Load a constructor value from a JSON payload
///
/// # Errors
///
/// [`ConstructError::Serialization`](crate::ConstructError::Serialization)
/// if the payload is not valid JSON for `C`.
pub fn from_payload<C: DeserializeOwned>(payload: &str) -> Result<C> {
    let constructor = serde_json::from_str(payload)?;
    tracing::trace!(
        constructor = %short_type_name::<C>(),
        bytes = payload.len(),
        "unpacked constructor"
    );
    Ok(constructor)
}

/// Send a constructor value through a payload and back
///
/// # Errors
///
/// [`ConstructError::Serialization`](crate::ConstructError::Serialization)
/// if either direction fails.
pub fn transport<C: Serialize + DeserializeOwned>(constructor: &C) -> Result<C> {
    from_payload(&to_payload(constructor)?)
}
