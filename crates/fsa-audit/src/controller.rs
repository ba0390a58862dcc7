//! # Audit Session Controller
//!
//! Entry point for every operation on one audit session. The controller is
//! the only writer of its session; reads go through [`snapshot`].
//!
//! Every method takes `&self`, so operations on different items may run
//! concurrently from one task (`tokio::join!`) or several. The session lock
//! is never held across a collaborator call.
//!
//! [`snapshot`]: AuditSessionController::snapshot

use std::sync::Arc;

use fsa_core::{Answer, AuditId, AuditItemId, EvidenceKey, GeoPoint, TemplateId, UnitId};

use crate::error::{AuditError, Operation, ValidationError};
use crate::gate;
use crate::optimistic::SessionCell;
use crate::pipeline::{EvidencePipeline, EvidenceReport};
use crate::ports::{AnnotationService, AuditBackend, EvidenceStore, GeneratedText, ImageData};
use crate::responses::ItemResponseManager;
use crate::score::{self, ScoreBreakdown};
use crate::session::{AuditSession, AuditStatus};

/// The external systems a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Audit persistence and final scoring.
    pub backend: Arc<dyn AuditBackend>,
    /// Photo storage.
    pub store: Arc<dyn EvidenceStore>,
    /// AI analysis and drafting.
    pub annotator: Arc<dyn AnnotationService>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Orchestrates one audit session.
pub struct AuditSessionController {
    cell: SessionCell,
    backend: Arc<dyn AuditBackend>,
    responses: ItemResponseManager,
    pipeline: EvidencePipeline,
}

impl AuditSessionController {
    /// Wrap a session already in memory.
    pub fn new(session: AuditSession, collaborators: Collaborators) -> Self {
        let cell = SessionCell::new(session);
        let Collaborators {
            backend,
            store,
            annotator,
        } = collaborators;
        Self {
            responses: ItemResponseManager::new(cell.clone(), Arc::clone(&backend)),
            pipeline: EvidencePipeline::new(cell.clone(), store, annotator),
            cell,
            backend,
        }
    }

    /// Start a new audit of `unit` against `template`. Every item begins
    /// unanswered. Fails if the backend does not know the unit or template.
    pub async fn start(
        collaborators: Collaborators,
        unit: UnitId,
        template: TemplateId,
        geo: Option<GeoPoint>,
    ) -> Result<Self, AuditError> {
        let session = collaborators
            .backend
            .start_audit(unit, template, geo)
            .await
            .map_err(|e| AuditError::collaborator(Operation::StartAudit, e))?;
        tracing::info!(
            audit_id = %session.id,
            unit_id = %unit,
            template_id = %template,
            items = session.items.len(),
            "audit started"
        );
        Ok(Self::new(session, collaborators))
    }

    /// Load an existing audit from the backend.
    pub async fn load(collaborators: Collaborators, audit: AuditId) -> Result<Self, AuditError> {
        let session = collaborators
            .backend
            .fetch_audit(audit)
            .await
            .map_err(|e| AuditError::collaborator(Operation::LoadAudit, e))?;
        tracing::info!(audit_id = %audit, status = %session.status, "audit loaded");
        Ok(Self::new(session, collaborators))
    }

    /// Copy of the current session state.
    pub fn snapshot(&self) -> AuditSession {
        self.cell.snapshot()
    }

    /// Session id.
    pub fn audit_id(&self) -> AuditId {
        self.cell.with(|s| s.id)
    }

    /// Session status.
    pub fn status(&self) -> AuditStatus {
        self.cell.with(|s| s.status)
    }

    /// Answered items as a rounded percentage.
    pub fn progress(&self) -> u8 {
        self.cell.with(|s| score::progress(s))
    }

    /// Answer counts and the weighted conformity preview.
    pub fn breakdown(&self) -> ScoreBreakdown {
        self.cell.with(|s| score::breakdown(s))
    }

    /// Whether finalize would pass the mandatory gate right now.
    pub fn is_finalize_allowed(&self) -> bool {
        self.cell.with(|s| gate::is_finalize_allowed(s))
    }

    /// Mandatory items still unanswered.
    pub fn missing_mandatory(&self) -> Vec<AuditItemId> {
        self.cell.with(|s| gate::missing_mandatory(s))
    }

    /// Set an item's answer and persist it.
    pub async fn answer_item(&self, item: AuditItemId, answer: Answer) -> Result<(), AuditError> {
        self.responses.set_answer(item, answer).await
    }

    /// Attach a photo to an answered item, store it and have it analyzed.
    pub async fn add_evidence(
        &self,
        item: AuditItemId,
        image: ImageData,
    ) -> Result<EvidenceReport, AuditError> {
        self.pipeline.add_evidence(item, image).await
    }

    /// Detach a photo and delete the stored copy.
    pub async fn remove_evidence(
        &self,
        item: AuditItemId,
        evidence: EvidenceKey,
    ) -> Result<(), AuditError> {
        self.pipeline.remove_evidence(item, evidence).await
    }

    /// Close an item's documentation with the auditor's observation.
    pub async fn save_observation(&self, item: AuditItemId, text: &str) -> Result<(), AuditError> {
        self.responses.save_observation(item, text).await
    }

    /// Have the AI draft the finding text for an answered item.
    pub async fn draft_finding(
        &self,
        item: AuditItemId,
        context: &str,
    ) -> Result<GeneratedText, AuditError> {
        self.pipeline.draft_finding(item, context).await
    }

    /// Close the audit. Refused while any mandatory item is unanswered;
    /// on success the backend's final score is stored on the session.
    pub async fn finalize(&self, general_observations: Option<String>) -> Result<(), AuditError> {
        let observations = general_observations
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty());

        let audit = self.cell.with(|s| -> Result<AuditId, ValidationError> {
            if s.status != AuditStatus::InProgress {
                return Err(ValidationError::InvalidTransition {
                    from: s.status,
                    to: AuditStatus::Finalized,
                });
            }
            gate::check(s)?;
            Ok(s.id)
        });
        let audit = match audit {
            Ok(audit) => audit,
            Err(e) => {
                if let ValidationError::MandatoryIncomplete { missing, .. } = &e {
                    tracing::info!(missing, "finalize refused by mandatory gate");
                }
                return Err(e.into());
            }
        };

        let receipt = self
            .backend
            .finalize_audit(audit, observations.as_deref())
            .await
            .map_err(|e| AuditError::collaborator(Operation::Finalize, e))?;

        self.cell
            .with(|s| s.mark_finalized(receipt.final_score, observations))?;
        tracing::info!(audit_id = %audit, final_score = ?receipt.final_score, "audit finalized");
        Ok(())
    }

    /// Return a finalized audit to in-progress. Item data is kept.
    pub async fn reopen(&self) -> Result<(), AuditError> {
        let audit = self.cell.with(|s| -> Result<AuditId, ValidationError> {
            if s.status != AuditStatus::Finalized {
                return Err(ValidationError::InvalidTransition {
                    from: s.status,
                    to: AuditStatus::InProgress,
                });
            }
            Ok(s.id)
        })?;

        self.backend
            .reopen_audit(audit)
            .await
            .map_err(|e| AuditError::collaborator(Operation::Reopen, e))?;

        self.cell.with(|s| s.mark_reopened())?;
        tracing::info!(audit_id = %audit, "audit reopened");
        Ok(())
    }
}

impl std::fmt::Debug for AuditSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.cell.with(|s| {
            f.debug_struct("AuditSessionController")
                .field("audit", &s.id)
                .field("status", &s.status)
                .field("items", &s.items.len())
                .finish()
        })
    }
}
