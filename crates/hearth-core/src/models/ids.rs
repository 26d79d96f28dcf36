//! Identifier newtypes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a signed-in person; doubles as their profile and live
/// location row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// Backend-assigned bigint identifiers, one newtype per table.
macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

record_id!(
    /// Task row id
    TaskId
);
record_id!(
    /// Calendar event row id
    EventId
);
record_id!(
    /// Work note row id
    WorkNoteId
);
record_id!(
    /// Financial reminder row id
    ReminderId
);
record_id!(
    /// Uploaded document row id
    DocumentId
);
record_id!(
    /// Gallery photo row id
    PhotoId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parse_roundtrip() {
        let id = UserId::from_uuid(Uuid::now_v7());
        let parsed: UserId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn record_ids_parse_trimmed_numbers() {
        assert_eq!(" 42 ".parse::<TaskId>().unwrap(), TaskId(42));
        assert!("abc".parse::<EventId>().is_err());
    }

    #[test]
    fn record_ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&PhotoId(7)).unwrap(), "7");
    }
}
