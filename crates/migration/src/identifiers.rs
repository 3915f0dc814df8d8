//! Newtype domain identifiers.
//!
//! Every identity that crosses a port boundary is a distinct newtype so that a
//! Pivotal [`SourceId`] can never be handed to a Jira call that expects an
//! [`IssueKey`], even though both are strings underneath.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is blank.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Stable identifier of a record in the source tracker (the Pivotal story id).
    ///
    /// Unique across the record set for the lifetime of a migration.
    SourceId
}

string_id! {
    /// Key of an issue created in the target tracker (e.g. `"PROJ-123"`).
    IssueKey
}

string_id! {
    /// Key of the target project new issues are created in.
    ProjectKey
}

string_id! {
    /// Identifier of a custom field in the target tracker (e.g. `"customfield_10016"`).
    FieldId
}

string_id! {
    /// Identifier of a workflow transition on a target issue.
    TransitionId
}

string_id! {
    /// Account identifier of a user in the target tracker.
    AccountId
}

// ---------------------------------------------------------------------------

/// Identifies one invocation of the migration tool.
///
/// Generated fresh per process and recorded on the root span so all activity
/// from a single run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
