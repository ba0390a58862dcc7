//! # In-Memory Collaborators
//!
//! Implementations of the collaborator ports for tests and local runs.
//! Each mock can be told to fail a given operation and counts the calls it
//! received. The store and the AI service can also be gated so a test can
//! hold an upload or an analysis in flight and release it later.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use fsa_core::{Answer, AuditId, AuditItemId, GeoPoint, PhotoId, TemplateId, UnitId};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::controller::Collaborators;
use crate::error::Operation;
use crate::gate;
use crate::item::{AuditItem, TemplateItem};
use crate::ports::{
    AnalysisRequest, AnnotationService, AuditBackend, EvidenceStore, FinalizeReceipt,
    GeneratedText, ImageAnnotation, ImageData, PortError, ResponseExtras, StoredPhoto,
    TextRequest,
};
use crate::score;
use crate::session::{AuditSession, AuditStatus};

/// Failure switches and call counters shared by the mocks.
#[derive(Debug, Default)]
struct Switchboard {
    failing: Mutex<HashSet<Operation>>,
    calls: Mutex<HashMap<Operation, usize>>,
}

impl Switchboard {
    fn enter(&self, op: Operation) -> Result<(), PortError> {
        *self.calls.lock().entry(op).or_default() += 1;
        if self.failing.lock().contains(&op) {
            return Err(PortError::Unavailable {
                reason: format!("{op} switched off"),
            });
        }
        Ok(())
    }

    fn set_failing(&self, op: Operation, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
    }

    fn calls(&self, op: Operation) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }
}

async fn pass_gate(gate: Option<&Arc<Semaphore>>) -> Result<(), PortError> {
    if let Some(gate) = gate {
        let permit = gate.acquire().await.map_err(|_| PortError::Unavailable {
            reason: "gate closed".into(),
        })?;
        permit.forget();
    }
    Ok(())
}

// ─── Backend ─────────────────────────────────────────────────────────

/// Unit record known to the mock backend.
#[derive(Debug, Clone)]
struct UnitRecord {
    activity_type: Option<String>,
}

/// In-memory backing API.
#[derive(Debug, Default)]
pub struct MockBackend {
    units: Mutex<HashMap<UnitId, UnitRecord>>,
    templates: Mutex<HashMap<TemplateId, Vec<TemplateItem>>>,
    audits: Mutex<HashMap<AuditId, AuditSession>>,
    switches: Switchboard,
}

impl MockBackend {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit.
    pub fn register_unit(&self, unit: UnitId, activity_type: Option<&str>) {
        self.units.lock().insert(
            unit,
            UnitRecord {
                activity_type: activity_type.map(str::to_string),
            },
        );
    }

    /// Register a checklist template.
    pub fn register_template(&self, template: TemplateId, items: Vec<TemplateItem>) {
        self.templates.lock().insert(template, items);
    }

    /// Store an audit as if it had been created earlier.
    pub fn insert_audit(&self, session: AuditSession) {
        self.audits.lock().insert(session.id, session);
    }

    /// Server-side copy of an audit.
    pub fn stored(&self, audit: AuditId) -> Option<AuditSession> {
        self.audits.lock().get(&audit).cloned()
    }

    /// Make `op` fail until switched back.
    pub fn set_failing(&self, op: Operation, failing: bool) {
        self.switches.set_failing(op, failing);
    }

    /// Calls received for `op`, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.switches.calls(op)
    }
}

#[async_trait]
impl AuditBackend for MockBackend {
    async fn start_audit(
        &self,
        unit: UnitId,
        template: TemplateId,
        geo: Option<GeoPoint>,
    ) -> Result<AuditSession, PortError> {
        self.switches.enter(Operation::StartAudit)?;
        let record = self
            .units
            .lock()
            .get(&unit)
            .cloned()
            .ok_or_else(|| PortError::NotFound {
                resource: unit.to_string(),
            })?;
        let items = self
            .templates
            .lock()
            .get(&template)
            .cloned()
            .ok_or_else(|| PortError::NotFound {
                resource: template.to_string(),
            })?;
        let items = items
            .into_iter()
            .map(|t| AuditItem::new(AuditItemId::new(), t))
            .collect();
        let mut session = AuditSession::new(AuditId::new(), unit, template, items);
        session.geo = geo;
        session.activity_type = record.activity_type;
        self.audits.lock().insert(session.id, session.clone());
        Ok(session)
    }

    async fn fetch_audit(&self, audit: AuditId) -> Result<AuditSession, PortError> {
        self.switches.enter(Operation::LoadAudit)?;
        self.stored(audit).ok_or_else(|| PortError::NotFound {
            resource: audit.to_string(),
        })
    }

    async fn save_response(
        &self,
        audit: AuditId,
        item: AuditItemId,
        answer: &Answer,
        extras: &ResponseExtras,
    ) -> Result<(), PortError> {
        let op = if extras.is_empty() {
            Operation::SaveAnswer
        } else {
            Operation::SaveObservation
        };
        self.switches.enter(op)?;
        let mut audits = self.audits.lock();
        let stored = audits.get_mut(&audit).ok_or_else(|| PortError::NotFound {
            resource: audit.to_string(),
        })?;
        let it = stored.item_mut(item).map_err(|e| PortError::NotFound {
            resource: e.to_string(),
        })?;
        it.answer = answer.clone();
        let fields = [
            (&mut it.observation, &extras.observation),
            (&mut it.ai_description, &extras.ai_description),
            (&mut it.non_conformity, &extras.non_conformity),
            (&mut it.legal_reference, &extras.legal_reference),
            (&mut it.corrective_actions, &extras.corrective_actions),
        ];
        for (slot, value) in fields {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        Ok(())
    }

    async fn finalize_audit(
        &self,
        audit: AuditId,
        general_observations: Option<&str>,
    ) -> Result<FinalizeReceipt, PortError> {
        self.switches.enter(Operation::Finalize)?;
        let mut audits = self.audits.lock();
        let stored = audits.get_mut(&audit).ok_or_else(|| PortError::NotFound {
            resource: audit.to_string(),
        })?;
        if let Err(e) = gate::check(stored) {
            return Err(PortError::Rejected {
                status: 400,
                body: e.to_string(),
            });
        }
        let final_score = score::breakdown(stored).conformity_index().or(Some(100.0));
        stored
            .mark_finalized(final_score, general_observations.map(str::to_string))
            .map_err(|e| PortError::Rejected {
                status: 409,
                body: e.to_string(),
            })?;
        Ok(FinalizeReceipt { final_score })
    }

    async fn reopen_audit(&self, audit: AuditId) -> Result<(), PortError> {
        self.switches.enter(Operation::Reopen)?;
        let mut audits = self.audits.lock();
        let stored = audits.get_mut(&audit).ok_or_else(|| PortError::NotFound {
            resource: audit.to_string(),
        })?;
        if stored.status != AuditStatus::Finalized {
            return Err(PortError::Rejected {
                status: 409,
                body: format!("audit is {}", stored.status),
            });
        }
        stored.mark_reopened().map_err(|e| PortError::Rejected {
            status: 409,
            body: e.to_string(),
        })
    }
}

// ─── Evidence store ──────────────────────────────────────────────────

/// In-memory photo store.
#[derive(Debug, Default)]
pub struct MockEvidenceStore {
    photos: Mutex<HashMap<PhotoId, (AuditId, AuditItemId)>>,
    next_id: AtomicU64,
    gate: Option<Arc<Semaphore>>,
    delete_gate: Option<Arc<Semaphore>>,
    switches: Switchboard,
}

impl MockEvidenceStore {
    /// Store that completes uploads immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose uploads wait for [`release_uploads`](Self::release_uploads).
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Let `n` waiting or future uploads through.
    pub fn release_uploads(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Store whose deletes wait for [`release_deletes`](Self::release_deletes).
    pub fn gated_deletes() -> Self {
        Self {
            delete_gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Let `n` waiting or future deletes through.
    pub fn release_deletes(&self, n: usize) {
        if let Some(gate) = &self.delete_gate {
            gate.add_permits(n);
        }
    }

    /// Number of photos currently stored.
    pub fn photo_count(&self) -> usize {
        self.photos.lock().len()
    }

    /// Whether a photo is stored.
    pub fn contains(&self, photo: &PhotoId) -> bool {
        self.photos.lock().contains_key(photo)
    }

    /// Make `op` fail until switched back.
    pub fn set_failing(&self, op: Operation, failing: bool) {
        self.switches.set_failing(op, failing);
    }

    /// Calls received for `op`, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.switches.calls(op)
    }
}

#[async_trait]
impl EvidenceStore for MockEvidenceStore {
    async fn upload_photo(
        &self,
        audit: AuditId,
        item: AuditItemId,
        image: &ImageData,
    ) -> Result<StoredPhoto, PortError> {
        pass_gate(self.gate.as_ref()).await?;
        self.switches.enter(Operation::UploadPhoto)?;
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = PhotoId::new(format!("foto-{n}")).map_err(|e| PortError::Malformed {
            reason: e.to_string(),
        })?;
        let extension = image.file_name.rsplit('.').next().unwrap_or("jpg");
        let url = format!("mock://fotos/{}/{n}.{extension}", audit.as_uuid());
        self.photos.lock().insert(id.clone(), (audit, item));
        Ok(StoredPhoto { id, url })
    }

    async fn delete_photo(
        &self,
        _audit: AuditId,
        _item: AuditItemId,
        photo: &PhotoId,
    ) -> Result<(), PortError> {
        pass_gate(self.delete_gate.as_ref()).await?;
        self.switches.enter(Operation::DeletePhoto)?;
        self.photos
            .lock()
            .remove(photo)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound {
                resource: photo.to_string(),
            })
    }
}

// ─── AI service ──────────────────────────────────────────────────────

/// Scripted AI service.
///
/// Results queued with [`push_annotation`](Self::push_annotation) are
/// returned in order; once the queue is empty every photo is judged
/// relevant and conforming.
#[derive(Debug, Default)]
pub struct MockAnnotationService {
    script: Mutex<VecDeque<Result<ImageAnnotation, PortError>>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
    gate: Option<Arc<Semaphore>>,
    switches: Switchboard,
}

impl MockAnnotationService {
    /// Service that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Service whose analyses wait for
    /// [`release_analyses`](Self::release_analyses).
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Let `n` waiting or future analyses through.
    pub fn release_analyses(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Queue the next analysis result.
    pub fn push_annotation(&self, result: Result<ImageAnnotation, PortError>) {
        self.script.lock().push_back(result);
    }

    /// `(question, activity_type)` of every analysis request received.
    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().clone()
    }

    /// Make `op` fail until switched back.
    pub fn set_failing(&self, op: Operation, failing: bool) {
        self.switches.set_failing(op, failing);
    }

    /// Calls received for `op`, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.switches.calls(op)
    }
}

#[async_trait]
impl AnnotationService for MockAnnotationService {
    async fn analyze_image(&self, request: &AnalysisRequest) -> Result<ImageAnnotation, PortError> {
        self.requests
            .lock()
            .push((request.question.clone(), request.activity_type.clone()));
        pass_gate(self.gate.as_ref()).await?;
        self.switches.enter(Operation::AnalyzeImage)?;
        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(ImageAnnotation {
                relevant: true,
                description: format!("Imagem compatível com: {}", request.question),
                non_conformity: None,
                severity: None,
                legal_reference: None,
                suggestions: Vec::new(),
            })
        })
    }

    async fn generate_text(&self, request: &TextRequest) -> Result<GeneratedText, PortError> {
        self.switches.enter(Operation::GenerateText)?;
        Ok(GeneratedText {
            technical_description: format!("Constatação: {}", request.context),
            legal_reference: Some("RDC ANVISA 216/2004".into()),
            corrective_actions: vec!["Corrigir a não conformidade e registrar a ação".into()],
        })
    }
}

// ─── Bundle ──────────────────────────────────────────────────────────

/// All three mocks, kept as concrete types for assertions.
#[derive(Debug, Clone)]
pub struct MockCollaborators {
    /// Backing API.
    pub backend: Arc<MockBackend>,
    /// Photo store.
    pub store: Arc<MockEvidenceStore>,
    /// AI service.
    pub annotator: Arc<MockAnnotationService>,
}

impl MockCollaborators {
    /// Immediate mocks.
    pub fn new() -> Self {
        Self::with(MockEvidenceStore::new(), MockAnnotationService::new())
    }

    /// Mocks built from the given store and AI service.
    pub fn with(store: MockEvidenceStore, annotator: MockAnnotationService) -> Self {
        Self {
            backend: Arc::new(MockBackend::new()),
            store: Arc::new(store),
            annotator: Arc::new(annotator),
        }
    }

    /// Type-erased handles for the controller.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            backend: self.backend.clone(),
            store: self.store.clone(),
            annotator: self.annotator.clone(),
        }
    }
}

impl Default for MockCollaborators {
    fn default() -> Self {
        Self::new()
    }
}
