//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. [`LineId`] is the one
//! composite identifier: a cart line is addressed either by a locally
//! generated UUID (guest lines that have never been sent to the backend) or
//! by the identifier the backend assigned when the line was created remotely.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use saltfern_core::define_id;
/// define_id!(ProductId);
/// define_id!(RemoteLineId);
///
/// let product_id = ProductId::new(1);
/// let line_id = RemoteLineId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = line_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(RemoteLineId);

/// Identifier of a cart line.
///
/// Guest lines are created before the backend has ever seen them, so they
/// carry a locally generated UUID. Once a line lives in the remote store it
/// is addressed by the backend-assigned [`RemoteLineId`] instead. The two
/// serialize as a string and a number respectively, which keeps stored guest
/// records readable and lets either shape round-trip through JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineId {
    /// Locally generated temporary identifier (guest lines only).
    Local(Uuid),
    /// Identifier assigned by the remote store.
    Remote(RemoteLineId),
}

impl LineId {
    /// Generate a fresh local identifier for a new guest line.
    #[must_use]
    pub fn local() -> Self {
        Self::Local(Uuid::new_v4())
    }

    /// The remote identifier, if this line exists in the remote store.
    #[must_use]
    pub const fn as_remote(&self) -> Option<RemoteLineId> {
        match self {
            Self::Local(_) => None,
            Self::Remote(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(uuid) => write!(f, "{uuid}"),
            Self::Remote(id) => write!(f, "{id}"),
        }
    }
}

impl From<RemoteLineId> for LineId {
    fn from(id: RemoteLineId) -> Self {
        Self::Remote(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn line_id_serializes_untagged() {
        let remote = LineId::Remote(RemoteLineId::new(42));
        assert_eq!(serde_json::to_value(remote).unwrap(), serde_json::json!(42));

        let local = LineId::local();
        let value = serde_json::to_value(local).unwrap();
        assert!(value.is_string());
    }

    #[test]
    fn line_id_round_trips_both_shapes() {
        let remote: LineId = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(remote.as_remote(), Some(RemoteLineId::new(7)));

        let uuid = Uuid::new_v4();
        let local: LineId = serde_json::from_value(serde_json::json!(uuid.to_string())).unwrap();
        assert_eq!(local, LineId::Local(uuid));
        assert_eq!(local.as_remote(), None);
    }
}
