//! # Evidence & Annotation Pipeline
//!
//! `add_evidence` runs three steps per photo:
//!
//! 1. **Select** — the item must be answered and below the cap. The entry is
//!    inserted as `Uploading`.
//! 2. **Upload** — the store persists the photo. On failure the insertion is
//!    rolled back and the error returned.
//! 3. **Analyze** — the AI judges the photo against the question. The result
//!    is merged into the evidence and overwrites the item's AI fields. An AI
//!    failure leaves the photo uploaded and is reported on the
//!    [`EvidenceReport`], not as an error.
//!
//! Additions on the same item are serialized through the upload step by a
//! per-item async lock, so concurrent selections cannot exceed the cap.
//! Analysis runs outside the lock.
//!
//! An AI result is merged only if its evidence is still attached and the
//! session is still in progress; otherwise it is dropped. A photo removed
//! while `Analyzing` is detached until the store confirms the delete; if
//! the delete fails after the result was dropped, the restored entry comes
//! back with its analysis cancelled.

use std::collections::HashMap;
use std::sync::Arc;

use fsa_core::{AuditItemId, EvidenceKey, PhotoId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Operation, ValidationError};
use crate::evidence::{Evidence, EvidenceStage};
use crate::optimistic::{apply_confirm_or_revert, SessionCell};
use crate::ports::{
    AnalysisRequest, AnnotationService, EvidenceStore, GeneratedText, ImageAnnotation, ImageData,
    PortError, Severity, StoredPhoto, TextRequest,
};
use crate::session::AuditSession;
use crate::MAX_EVIDENCE_PER_ITEM;

/// What happened to the AI step of an evidence addition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnnotationOutcome {
    /// Annotation merged into the evidence and the item.
    Annotated {
        /// Severity reported by the AI, if any.
        severity: Option<Severity>,
    },
    /// The AI judged the photo irrelevant to the question. The evidence is
    /// kept and flagged; the item's AI fields were still updated.
    NotRelevant,
    /// The AI call failed; the photo stays uploaded without annotation.
    Failed {
        /// Collaborator error message.
        reason: String,
    },
    /// The result arrived after its evidence was removed or the session was
    /// closed, and was dropped.
    Discarded,
}

/// Result of a successful evidence addition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceReport {
    /// Local key of the new evidence.
    pub key: EvidenceKey,
    /// The stored copy.
    pub photo: StoredPhoto,
    /// AI step outcome.
    pub outcome: AnnotationOutcome,
}

impl EvidenceReport {
    /// True when the photo was stored but the AI step failed.
    pub fn is_partial_failure(&self) -> bool {
        matches!(self.outcome, AnnotationOutcome::Failed { .. })
    }
}

/// One async lock per item, created on first use.
#[derive(Default)]
struct ItemLocks(Mutex<HashMap<AuditItemId, Arc<tokio::sync::Mutex<()>>>>);

impl ItemLocks {
    fn for_item(&self, item: AuditItemId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.0.lock().entry(item).or_default())
    }
}

/// Evidence taken off its item by a removal awaiting the store. The flag
/// is set when an analysis result for it was dropped in the meantime.
#[derive(Default)]
struct Detached(Mutex<HashMap<EvidenceKey, bool>>);

impl Detached {
    fn insert(&self, key: EvidenceKey) {
        self.0.lock().insert(key, false);
    }

    /// Record a dropped result; false if `key` is not detached.
    fn drop_result(&self, key: EvidenceKey) -> bool {
        match self.0.lock().get_mut(&key) {
            Some(dropped) => {
                *dropped = true;
                true
            }
            None => false,
        }
    }

    /// Forget `key`, returning whether a result was dropped for it.
    fn settle(&self, key: EvidenceKey) -> bool {
        self.0.lock().remove(&key).unwrap_or(false)
    }
}

pub(crate) struct EvidencePipeline {
    cell: SessionCell,
    store: Arc<dyn EvidenceStore>,
    annotator: Arc<dyn AnnotationService>,
    locks: ItemLocks,
    detached: Detached,
}

impl EvidencePipeline {
    pub(crate) fn new(
        cell: SessionCell,
        store: Arc<dyn EvidenceStore>,
        annotator: Arc<dyn AnnotationService>,
    ) -> Self {
        Self {
            cell,
            store,
            annotator,
            locks: ItemLocks::default(),
            detached: Detached::default(),
        }
    }

    pub(crate) async fn add_evidence(
        &self,
        item: AuditItemId,
        image: ImageData,
    ) -> Result<EvidenceReport, AuditError> {
        let lock = self.locks.for_item(item);
        let upload_guard = lock.lock().await;

        let store = &self.store;
        let upload_image = &image;
        let (key, photo) = apply_confirm_or_revert(
            &self.cell,
            Operation::UploadPhoto,
            |s| {
                let audit = s.id;
                let it = s.editable_item_mut(item)?;
                it.ensure_accepts_evidence(MAX_EVIDENCE_PER_ITEM)?;
                let mut evidence = Evidence::selected(upload_image);
                evidence.begin_upload()?;
                let key = evidence.key;
                it.evidence.push(evidence);
                Ok((key, (audit, key)))
            },
            |(audit, key)| async move {
                store
                    .upload_photo(audit, item, upload_image)
                    .await
                    .map(|photo| (key, photo))
            },
            |s, key| {
                if let Ok(it) = s.item_mut(item) {
                    it.take_evidence(key);
                }
            },
        )
        .await?;

        let recorded = self.cell.with(|s| {
            let evidence = s
                .item_mut(item)
                .ok()
                .and_then(|it| it.evidence_mut(key))?;
            evidence.mark_uploaded(photo.clone()).ok()
        });
        drop(upload_guard);

        if recorded.is_none() {
            tracing::warn!(
                item_id = %item,
                evidence = %key,
                photo = %photo.id,
                "stored photo no longer attached to the session"
            );
            return Ok(EvidenceReport {
                key,
                photo,
                outcome: AnnotationOutcome::Discarded,
            });
        }
        tracing::info!(item_id = %item, evidence = %key, photo = %photo.id, "photo stored");

        let outcome = self.annotate(item, key, image).await;
        Ok(EvidenceReport {
            key,
            photo,
            outcome,
        })
    }

    async fn annotate(
        &self,
        item: AuditItemId,
        key: EvidenceKey,
        image: ImageData,
    ) -> AnnotationOutcome {
        let request = self.cell.with(|s| {
            if !s.is_editable() {
                return None;
            }
            let activity_type = s.activity_type.clone();
            let it = s.item_mut(item).ok()?;
            let question = it.template_item.question.clone();
            let category = it.template_item.category.clone();
            it.evidence_mut(key)?.begin_analysis().ok()?;
            Some(AnalysisRequest {
                image,
                question,
                category,
                activity_type,
            })
        });
        let Some(request) = request else {
            tracing::debug!(
                item_id = %item,
                evidence = %key,
                "analysis skipped; session closed or evidence removed"
            );
            return AnnotationOutcome::Discarded;
        };

        let result = self.annotator.analyze_image(&request).await;
        self.cell.with(|s| {
            let outcome = merge_analysis(s, item, key, result);
            if outcome == AnnotationOutcome::Discarded && self.detached.drop_result(key) {
                tracing::debug!(item_id = %item, evidence = %key, "result dropped during removal");
            }
            outcome
        })
    }

    pub(crate) async fn remove_evidence(
        &self,
        item: AuditItemId,
        key: EvidenceKey,
    ) -> Result<(), AuditError> {
        let store = &self.store;
        let detached = &self.detached;
        let removed = apply_confirm_or_revert(
            &self.cell,
            Operation::DeletePhoto,
            |s| {
                let audit = s.id;
                let it = s.editable_item_mut(item)?;
                let stage = it
                    .evidence(key)
                    .map(Evidence::stage)
                    .ok_or(ValidationError::UnknownEvidence {
                        item,
                        evidence: key,
                    })?;
                if matches!(stage, EvidenceStage::Selected | EvidenceStage::Uploading) {
                    return Err(ValidationError::EvidenceInFlight {
                        item,
                        pending: it.in_flight_count(),
                    }
                    .into());
                }
                let (pos, evidence) = it.take_evidence(key).ok_or(ValidationError::UnknownEvidence {
                    item,
                    evidence: key,
                })?;
                if stage == EvidenceStage::Analyzing {
                    detached.insert(key);
                }
                let photo: Option<PhotoId> = evidence.photo.as_ref().map(|p| p.id.clone());
                Ok(((pos, evidence), (audit, photo)))
            },
            |(audit, photo)| async move {
                match photo {
                    Some(photo) => store.delete_photo(audit, item, &photo).await,
                    None => Ok(()),
                }
            },
            |s, (pos, mut evidence)| {
                if detached.settle(key) {
                    if let Err(e) = evidence.cancel_analysis() {
                        tracing::debug!(
                            item_id = %item,
                            evidence = %key,
                            error = %e,
                            "analysis not cancelled"
                        );
                    }
                }
                if let Ok(it) = s.item_mut(item) {
                    if it.evidence(evidence.key).is_none() {
                        it.restore_evidence(pos, evidence);
                    }
                }
            },
        )
        .await;
        detached.settle(key);
        removed?;
        tracing::info!(item_id = %item, evidence = %key, "photo removed");
        Ok(())
    }

    /// Ask the AI to draft the finding text for an answered item and write
    /// it to the item's AI fields.
    pub(crate) async fn draft_finding(
        &self,
        item: AuditItemId,
        context: &str,
    ) -> Result<GeneratedText, AuditError> {
        let request = self.cell.with(|s| -> Result<TextRequest, ValidationError> {
            let activity_type = s.activity_type.clone();
            let it = s.editable_item_mut(item)?;
            if !it.is_answered() {
                return Err(ValidationError::ItemUnanswered { item });
            }
            let context = context.trim();
            if context.is_empty() {
                return Err(ValidationError::EmptyObservation { item });
            }
            Ok(TextRequest {
                context: context.to_string(),
                activity_type,
            })
        })?;

        let text = self
            .annotator
            .generate_text(&request)
            .await
            .map_err(|e| AuditError::collaborator(Operation::GenerateText, e))?;

        let merged = self.cell.with(|s| {
            if !s.is_editable() {
                return false;
            }
            match s.item_mut(item) {
                Ok(it) => {
                    it.merge_generated_text(&text);
                    true
                }
                Err(_) => false,
            }
        });
        if merged {
            tracing::info!(item_id = %item, "finding drafted");
        } else {
            tracing::debug!(item_id = %item, "drafted text dropped; session closed");
        }
        Ok(text)
    }
}

fn merge_analysis(
    session: &mut AuditSession,
    item: AuditItemId,
    key: EvidenceKey,
    result: Result<ImageAnnotation, PortError>,
) -> AnnotationOutcome {
    let editable = session.is_editable();
    let Some(it) = session.item_mut(item).ok() else {
        tracing::debug!(item_id = %item, evidence = %key, "analysis result discarded; item gone");
        return AnnotationOutcome::Discarded;
    };
    let Some(evidence) = it.evidence_mut(key) else {
        tracing::debug!(
            item_id = %item,
            evidence = %key,
            "analysis result discarded; evidence removed"
        );
        return AnnotationOutcome::Discarded;
    };

    if !editable {
        if let Err(e) = evidence.cancel_analysis() {
            tracing::debug!(item_id = %item, evidence = %key, error = %e, "analysis not cancelled");
        }
        tracing::debug!(
            item_id = %item,
            evidence = %key,
            "analysis result discarded; session closed"
        );
        return AnnotationOutcome::Discarded;
    }

    match result {
        Ok(annotation) => {
            if let Err(e) = evidence.apply_annotation(annotation.clone()) {
                tracing::debug!(
                    item_id = %item,
                    evidence = %key,
                    error = %e,
                    "analysis result discarded"
                );
                return AnnotationOutcome::Discarded;
            }
            it.merge_annotation(&annotation);
            if annotation.relevant {
                tracing::info!(
                    item_id = %item,
                    evidence = %key,
                    severity = ?annotation.severity,
                    "photo annotated"
                );
                AnnotationOutcome::Annotated {
                    severity: annotation.severity,
                }
            } else {
                tracing::warn!(
                    item_id = %item,
                    evidence = %key,
                    "photo judged not relevant to the question"
                );
                AnnotationOutcome::NotRelevant
            }
        }
        Err(source) => {
            if let Err(e) = evidence.mark_analysis_failed() {
                tracing::debug!(
                    item_id = %item,
                    evidence = %key,
                    error = %e,
                    "failure not recorded"
                );
            }
            tracing::warn!(
                item_id = %item,
                evidence = %key,
                operation = %Operation::AnalyzeImage,
                error = %source,
                "analysis failed; photo kept without annotation"
            );
            AnnotationOutcome::Failed {
                reason: source.to_string(),
            }
        }
    }
}
