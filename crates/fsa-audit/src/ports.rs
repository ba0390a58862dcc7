//! # Collaborator Ports
//!
//! Async traits for the external systems the audit core depends on:
//!
//! - [`AuditBackend`] — the backing API that persists audits and answers
//!   and computes the final score.
//! - [`EvidenceStore`] — photo storage per audit item.
//! - [`AnnotationService`] — AI image analysis and text drafting.
//!
//! The core treats every call as independent and never retries; retry is a
//! caller decision. Implementations must be `Send + Sync` so they can be
//! shared behind an `Arc`, and the traits are object-safe so the concrete
//! adapter (HTTP or in-memory) is chosen at runtime.

use std::sync::Arc;

use async_trait::async_trait;
use fsa_core::{AuditId, AuditItemId, Answer, GeoPoint, PhotoId, TemplateId, UnitId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::AuditSession;

/// Errors reported by collaborator adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// Service unreachable or returned a 5xx status.
    #[error("service unavailable: {reason}")]
    Unavailable {
        /// Human-readable cause.
        reason: String,
    },

    /// The call timed out.
    #[error("request timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time before the timeout fired.
        elapsed_ms: u64,
    },

    /// The service rejected the request (4xx other than 404).
    #[error("request rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// The referenced resource does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// What was looked up.
        resource: String,
    },

    /// The response could not be understood.
    #[error("malformed response: {reason}")]
    Malformed {
        /// Decoding failure.
        reason: String,
    },
}

// ─── Payloads ────────────────────────────────────────────────────────

/// Raw image selected by the auditor.
///
/// Bytes are reference-counted so the same payload can go to the store and
/// to the AI service without copying.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Original file name.
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`.
    pub content_type: String,
    /// Encoded image.
    pub bytes: Arc<[u8]>,
}

impl ImageData {
    /// Wrap an encoded image.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// A photo persisted by the evidence store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPhoto {
    /// Server identifier.
    pub id: PhotoId,
    /// Retrieval URL.
    pub url: String,
}

/// Optional documentation fields sent with `responderItem`.
///
/// `None` fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseExtras {
    /// Auditor observation (`observacao`).
    pub observation: Option<String>,
    /// AI description (`descricaoIa`).
    pub ai_description: Option<String>,
    /// Non-conformity classification (`descricaoNaoConformidade`).
    pub non_conformity: Option<String>,
    /// Legal reference (`referenciaLegal`).
    pub legal_reference: Option<String>,
    /// Suggested action plan (`planoAcaoSugerido`).
    pub corrective_actions: Option<String>,
}

impl ResponseExtras {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.observation.is_none()
            && self.ai_description.is_none()
            && self.non_conformity.is_none()
            && self.legal_reference.is_none()
            && self.corrective_actions.is_none()
    }
}

/// Result of a successful finalize call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalizeReceipt {
    /// Final score computed by the backend, when it returns one.
    pub final_score: Option<f64>,
}

/// Non-conformity severity reported by the AI service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor.
    Baixa,
    /// Moderate.
    Media,
    /// Serious.
    Alta,
    /// Immediate risk to food safety.
    Critica,
    /// Value this client does not know.
    #[serde(other)]
    Desconhecida,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Baixa => "baixa",
            Self::Media => "media",
            Self::Alta => "alta",
            Self::Critica => "critica",
            Self::Desconhecida => "desconhecida",
        };
        f.write_str(s)
    }
}

/// Input to the AI image analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// The photo.
    pub image: ImageData,
    /// Checklist question (`pergunta`).
    pub question: String,
    /// Item category (`categoria`).
    pub category: String,
    /// Activity type of the audited unit (`tipoAtividade`).
    pub activity_type: Option<String>,
}

/// AI judgment for one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotation {
    /// Whether the image is relevant to the question (`imagemRelevante`).
    pub relevant: bool,
    /// What the AI sees (`descricaoIa`).
    pub description: String,
    /// Non-conformity classification (`tipoNaoConformidade`).
    pub non_conformity: Option<String>,
    /// Severity (`gravidade`).
    pub severity: Option<Severity>,
    /// Legal reference (`referenciaLegal`).
    pub legal_reference: Option<String>,
    /// Suggested corrective actions (`sugestoes`).
    pub suggestions: Vec<String>,
}

/// Input to AI text drafting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest {
    /// Free-text context (`contexto`).
    pub context: String,
    /// Activity type of the audited unit (`tipoAtividade`).
    pub activity_type: Option<String>,
}

/// AI-drafted finding text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedText {
    /// Technical description (`descricaoTecnica`).
    pub technical_description: String,
    /// Legal reference (`referenciaLegal`).
    pub legal_reference: Option<String>,
    /// Corrective actions (`planoAcao.acoesCorretivas`).
    pub corrective_actions: Vec<String>,
}

// ─── Traits ──────────────────────────────────────────────────────────

/// The backing API that owns audit persistence.
#[async_trait]
pub trait AuditBackend: Send + Sync {
    /// Create an audit for a unit/template pair with every item unanswered.
    async fn start_audit(
        &self,
        unit: UnitId,
        template: TemplateId,
        geo: Option<GeoPoint>,
    ) -> Result<AuditSession, PortError>;

    /// Load an audit by id.
    async fn fetch_audit(&self, audit: AuditId) -> Result<AuditSession, PortError>;

    /// Persist an item's answer with optional documentation fields.
    async fn save_response(
        &self,
        audit: AuditId,
        item: AuditItemId,
        answer: &Answer,
        extras: &ResponseExtras,
    ) -> Result<(), PortError>;

    /// Finalize the audit. The backend computes and stores the final score.
    async fn finalize_audit(
        &self,
        audit: AuditId,
        general_observations: Option<&str>,
    ) -> Result<FinalizeReceipt, PortError>;

    /// Return a finalized audit to in-progress.
    async fn reopen_audit(&self, audit: AuditId) -> Result<(), PortError>;
}

/// Photo storage for audit items.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Store a photo and return its identifier and URL.
    async fn upload_photo(
        &self,
        audit: AuditId,
        item: AuditItemId,
        image: &ImageData,
    ) -> Result<StoredPhoto, PortError>;

    /// Delete a stored photo.
    async fn delete_photo(
        &self,
        audit: AuditId,
        item: AuditItemId,
        photo: &PhotoId,
    ) -> Result<(), PortError>;
}

/// AI analysis and drafting.
#[async_trait]
pub trait AnnotationService: Send + Sync {
    /// Judge a photo against a checklist question.
    async fn analyze_image(&self, request: &AnalysisRequest) -> Result<ImageAnnotation, PortError>;

    /// Draft a technical finding from free text.
    async fn generate_text(&self, request: &TextRequest) -> Result<GeneratedText, PortError>;
}
