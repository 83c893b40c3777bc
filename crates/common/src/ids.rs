use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Length of the canonical hyphenated form, the only accepted text format.
const CANONICAL_LEN: usize = 36;

/// Reasons an identifier fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier was an empty string.
    #[error("identifier must not be empty")]
    Empty,

    /// The identifier is not a canonical hyphenated UUID.
    #[error("identifier {0:?} is not a canonical UUID")]
    Malformed(String),

    /// The identifier parsed but is not time-ordered (UUID version 7).
    #[error("identifier {0:?} is not a sortable (version 7) UUID")]
    NotSortable(String),
}

fn parse_sortable(raw: &str) -> Result<Uuid, IdError> {
    if raw.is_empty() {
        return Err(IdError::Empty);
    }

    if raw.len() != CANONICAL_LEN {
        return Err(IdError::Malformed(raw.to_string()));
    }

    let uuid = Uuid::try_parse(raw).map_err(|_| IdError::Malformed(raw.to_string()))?;

    if uuid.get_version() != Some(uuid::Version::SortRand) {
        return Err(IdError::NotSortable(raw.to_string()));
    }

    Ok(uuid)
}

macro_rules! sortable_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new identifier ordered after every one generated before it.
            pub fn generate() -> Self {
                Self(Uuid::now_v7())
            }

            /// Parses and validates an identifier from its canonical text form.
            pub fn parse(raw: &str) -> Result<Self, IdError> {
                parse_sortable(raw).map(Self)
            }

            /// Wraps a UUID read back from storage.
            ///
            /// No version check is made: stored identifiers were validated on the way in.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

sortable_id!(
    /// Unique identifier of a cargo aggregate.
    CargoId
);

sortable_id!(
    /// Unique identifier of a single tracking ledger entry.
    TrackingId
);

sortable_id!(
    /// Identifier of the vessel a cargo is attached to.
    VesselId
);
