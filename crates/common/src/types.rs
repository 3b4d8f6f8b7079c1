//! Identifier types shared by the client crates.
//!
//! Room, participant and track ids are assigned by the conferencing SDK and
//! are opaque strings to the client. Element ids are minted locally whenever a
//! track is attached to a rendering surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! sdk_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an SDK-assigned id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw id.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

sdk_id!(
    /// Session-scoped id of a connected room.
    RoomSid
);

sdk_id!(
    /// Stable, session-scoped id of a participant.
    ParticipantSid
);

sdk_id!(
    /// Id of a track publication.
    TrackSid
);

/// Unique identifier for a rendered media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub Uuid);

impl ElementId {
    /// Create a new random element ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
