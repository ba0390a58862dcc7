//! # Audit Error Types
//!
//! Two classes reach callers:
//!
//! - [`ValidationError`] — an illegal operation for the current state
//!   (evidence on an unanswered item, finalize with open mandatory items).
//!   Detected locally; no collaborator call is issued.
//! - [`AuditError::Collaborator`] — the backing API, evidence store or AI
//!   service failed. Any optimistic local change has already been reverted
//!   when this is returned; the session stays usable.
//!
//! Partial pipeline failures (photo stored, analysis failed) are not errors;
//! they are reported on the `EvidenceReport`. Stale AI results are dropped
//! without surfacing anything.

use fsa_core::{AuditId, AuditItemId, EvidenceKey};
use thiserror::Error;

use crate::evidence::EvidenceStage;
use crate::ports::PortError;
use crate::session::AuditStatus;

/// The collaborator operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `iniciarAuditoria`.
    StartAudit,
    /// `buscarAuditoriaPorId`.
    LoadAudit,
    /// `responderItem` carrying a new answer.
    SaveAnswer,
    /// `responderItem` carrying the item's documentation.
    SaveObservation,
    /// `adicionarFoto`.
    UploadPhoto,
    /// `removerFoto`.
    DeletePhoto,
    /// `analisarImagemChecklist`.
    AnalyzeImage,
    /// `gerarTexto`.
    GenerateText,
    /// `finalizarAuditoria`.
    Finalize,
    /// Reopen a finalized audit.
    Reopen,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StartAudit => "start_audit",
            Self::LoadAudit => "load_audit",
            Self::SaveAnswer => "save_answer",
            Self::SaveObservation => "save_observation",
            Self::UploadPhoto => "upload_photo",
            Self::DeletePhoto => "delete_photo",
            Self::AnalyzeImage => "analyze_image",
            Self::GenerateText => "generate_text",
            Self::Finalize => "finalize",
            Self::Reopen => "reopen",
        };
        f.write_str(s)
    }
}

/// Operation rejected by the session state machine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The session is not `InProgress`.
    #[error("audit {audit} is {status}; only in-progress audits can be edited")]
    SessionNotEditable {
        /// The audit.
        audit: AuditId,
        /// Its current status.
        status: AuditStatus,
    },

    /// Session lifecycle transition not allowed from the current status.
    #[error("invalid audit transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: AuditStatus,
        /// Attempted target status.
        to: AuditStatus,
    },

    /// No item with this id in the session.
    #[error("{item} does not belong to this audit")]
    UnknownItem {
        /// The requested item.
        item: AuditItemId,
    },

    /// No evidence with this key on the item.
    #[error("{evidence} is not attached to {item}")]
    UnknownEvidence {
        /// The item.
        item: AuditItemId,
        /// The requested evidence.
        evidence: EvidenceKey,
    },

    /// The answer is not a member of the item's answer set.
    #[error("answer {answer:?} is not an allowed option for {item}")]
    AnswerNotAllowed {
        /// The item.
        item: AuditItemId,
        /// The rejected answer, wire form.
        answer: String,
    },

    /// Evidence can only be attached to answered items.
    #[error("{item} must be answered before photos can be attached")]
    ItemUnanswered {
        /// The item.
        item: AuditItemId,
    },

    /// The item already holds the maximum number of photos.
    #[error("{item} already has the maximum of {cap} photos")]
    EvidenceCapReached {
        /// The item.
        item: AuditItemId,
        /// The cap.
        cap: usize,
    },

    /// Documentation cannot be closed with a blank observation.
    #[error("observation for {item} must not be empty")]
    EmptyObservation {
        /// The item.
        item: AuditItemId,
    },

    /// Evidence on the item is still uploading or being analyzed.
    #[error("{item} has {pending} photo(s) still uploading or under analysis")]
    EvidenceInFlight {
        /// The item.
        item: AuditItemId,
        /// Number of evidence entries not yet settled.
        pending: usize,
    },

    /// Finalize denied by the mandatory gate.
    #[error("{missing} mandatory item(s) not answered")]
    MandatoryIncomplete {
        /// Exact number of unanswered mandatory items.
        missing: usize,
        /// Their ids, in checklist order.
        items: Vec<AuditItemId>,
    },

    /// Evidence stage transition not allowed.
    #[error("invalid evidence transition for {evidence}: {from} -> {to}")]
    InvalidEvidenceTransition {
        /// The evidence.
        evidence: EvidenceKey,
        /// Current stage.
        from: EvidenceStage,
        /// Attempted stage.
        to: EvidenceStage,
    },
}

/// Errors returned by the audit core.
#[derive(Error, Debug)]
pub enum AuditError {
    /// Rejected locally by the state machine.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A collaborator call failed; local state was rolled back.
    #[error("{operation} failed: {source}")]
    Collaborator {
        /// The failed operation.
        operation: Operation,
        /// The collaborator error.
        #[source]
        source: PortError,
    },
}

impl AuditError {
    /// Build a collaborator error.
    pub fn collaborator(operation: Operation, source: PortError) -> Self {
        Self::Collaborator { operation, source }
    }

    /// The validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(v) => Some(v),
            Self::Collaborator { .. } => None,
        }
    }

    /// The failed operation, for collaborator errors.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Validation(_) => None,
            Self::Collaborator { operation, .. } => Some(*operation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandatory_message_carries_exact_count() {
        let err = ValidationError::MandatoryIncomplete {
            missing: 3,
            items: vec![AuditItemId::new(), AuditItemId::new(), AuditItemId::new()],
        };
        assert_eq!(err.to_string(), "3 mandatory item(s) not answered");
    }

    #[test]
    fn collaborator_error_names_operation() {
        let err = AuditError::collaborator(
            Operation::UploadPhoto,
            PortError::Unavailable {
                reason: "connection reset".into(),
            },
        );
        assert_eq!(err.operation(), Some(Operation::UploadPhoto));
        assert!(err.as_validation().is_none());
        assert!(err.to_string().starts_with("upload_photo failed"));
    }

    #[test]
    fn validation_converts_into_audit_error() {
        let item = AuditItemId::new();
        let err: AuditError = ValidationError::ItemUnanswered { item }.into();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::ItemUnanswered { item })
        );
        assert!(err.operation().is_none());
    }
}
