//! # fsa-core — Foundational Types for the Audit Core
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! builds on: identifier newtypes, the UTC-only `Timestamp`, geolocation,
//! the tagged checklist `Answer`, and image digests for stored evidence.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `AuditId`, `AuditItemId`,
//!    `TemplateId`, `UnitId`. You cannot pass an item id where an audit id
//!    is expected.
//!
//! 2. **Tagged answers.** A checklist answer is an `Answer` value (fixed
//!    four-state set or a template-defined option), never a bare string.
//!    Membership in an item's allowed set is checked by `AnswerSet::allows`.
//!
//! 3. **UTC-only timestamps** with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `fsa-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod answer;
pub mod digest;
pub mod error;
pub mod identity;
pub mod location;
pub mod temporal;

pub use answer::{Answer, AnswerSet};
pub use digest::ImageDigest;
pub use error::FsaError;
pub use identity::{AuditId, AuditItemId, EvidenceKey, PhotoId, TemplateId, TemplateItemId, UnitId};
pub use location::GeoPoint;
pub use temporal::Timestamp;
