//! Domain models for the lifelog tracker.
//!
//! Entities are plain serde records; every entity exposes `validate()` which
//! the editing service runs before anything is written to the store.

mod activity;
mod expense;
mod tag;
mod validation;

pub use activity::*;
pub use expense::*;
pub use tag::*;
pub use validation::*;

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Tag`].
    TagId
);
entity_id!(
    /// Identifier of an [`Expense`].
    ExpenseId
);
entity_id!(
    /// Identifier of an [`Activity`].
    ActivityId
);

/// Serde helper encoding a `std::time::Duration` as whole seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Body returned by create endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Created<Id> {
    pub id: Id,
}
