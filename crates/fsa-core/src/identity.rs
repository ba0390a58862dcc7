//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers the audit core handles. Backend
//! records (audits, items, templates, units) are keyed by UUID. Stored photos
//! carry an opaque server-assigned `PhotoId`. Evidence that has not been
//! persisted yet is tracked by a client-side `EvidenceKey`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FsaError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Parse from the hyphenated UUID string form.
            pub fn parse(s: &str) -> Result<Self, FsaError> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| FsaError::InvalidIdentifier(format!("{s:?}: {e}")))
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_newtype!(
    /// Unique identifier for an audit session.
    AuditId,
    "audit"
);

uuid_newtype!(
    /// Unique identifier for a checklist item inside an audit session.
    AuditItemId,
    "item"
);

uuid_newtype!(
    /// Unique identifier for a checklist template.
    TemplateId,
    "template"
);

uuid_newtype!(
    /// Unique identifier for a question inside a checklist template.
    TemplateItemId,
    "template-item"
);

uuid_newtype!(
    /// Unique identifier for the audited unit (establishment).
    UnitId,
    "unit"
);

uuid_newtype!(
    /// Client-side key for an evidence entry.
    ///
    /// Assigned when the auditor selects an image, before any server id
    /// exists. Late pipeline results are matched against this key.
    EvidenceKey,
    "evidence"
);

/// Server-assigned identifier of a stored photo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    /// Wrap a server identifier. Rejects empty strings.
    pub fn new(id: impl Into<String>) -> Result<Self, FsaError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FsaError::InvalidIdentifier("photo id must not be empty".into()));
        }
        Ok(Self(id))
    }

    /// Access the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhotoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "photo:{}", self.0)
    }
}
