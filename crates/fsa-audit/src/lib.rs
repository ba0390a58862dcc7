//! # fsa-audit — Audit-Execution Core
//!
//! Governs a single on-site audit session: how checklist items move from
//! unanswered to answered, how photo evidence and AI annotations attach to
//! an item, how mandatory completeness gates finalization, and how progress
//! is derived from the item collection.
//!
//! ## Components
//!
//! - **Session model** (`session.rs`, `item.rs`, `evidence.rs`):
//!   `AuditSession` owns its `AuditItem`s, each item owns its `Evidence`.
//!   Session lifecycle `InProgress ⇄ Finalized`, `Cancelled` only by removal.
//!
//! - **Item Response Manager** (`responses.rs`): answer and observation
//!   changes, applied locally then confirmed with the backend or reverted.
//!
//! - **Evidence & Annotation Pipeline** (`pipeline.rs`):
//!   `selected → uploading → uploaded → analyzing → annotated`, with
//!   independent failure handling per stage and a stale-result guard.
//!
//! - **Mandatory Gate** (`gate.rs`) and **Score Aggregator** (`score.rs`):
//!   pure functions over a session snapshot, recomputed on every call.
//!
//! - **Audit Session Controller** (`controller.rs`): the only writer of the
//!   session; exposes answer, evidence, observation, finalize and reopen.
//!
//! - **Collaborator ports** (`ports.rs`): async traits for the backing API,
//!   the evidence store and the AI service. HTTP implementations live in
//!   `fsa-client`; in-memory ones in `mock.rs`.
//!
//! ## Error model
//!
//! Validation failures are reported synchronously and never reach a
//! collaborator. Collaborator failures are returned after the optimistic
//! local change has been rolled back. Late AI results for evidence that no
//! longer exists are dropped silently. Nothing here is fatal to a session.

pub mod controller;
pub mod error;
pub mod evidence;
pub mod gate;
pub mod item;
pub(crate) mod optimistic;
pub mod pipeline;
pub mod ports;
mod responses;
pub mod score;
pub mod session;

#[cfg(feature = "mock")]
pub mod mock;

/// Maximum number of photos attached to one checklist item.
pub const MAX_EVIDENCE_PER_ITEM: usize = 5;

// ─── Re-exports ─────────────────────────────────────────────────────

pub use controller::{AuditSessionController, Collaborators};
pub use error::{AuditError, Operation, ValidationError};
pub use evidence::{AnalysisStatus, Evidence, EvidenceStage, ImageRef, UploadStatus};
pub use gate::{is_finalize_allowed, missing_mandatory};
pub use item::{AuditItem, TemplateItem};
pub use pipeline::{AnnotationOutcome, EvidenceReport};
pub use ports::{
    AnalysisRequest, AnnotationService, AuditBackend, EvidenceStore, FinalizeReceipt,
    GeneratedText, ImageAnnotation, ImageData, PortError, ResponseExtras, Severity, StoredPhoto,
    TextRequest,
};
pub use score::{breakdown, progress, ScoreBreakdown};
pub use session::{AuditSession, AuditStatus, AuditTransitionRecord};
