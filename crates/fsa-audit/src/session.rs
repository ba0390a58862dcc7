//! # Audit Session Lifecycle
//!
//! ```text
//!            finalize (mandatory gate open)
//! InProgress ─────────────────────────────▶ Finalized
//!     ▲                                         │
//!     └───────────────── reopen ────────────────┘
//!
//! Cancelled: set only when the audit is removed; never entered from an
//! in-session operation and never left.
//! ```
//!
//! Item answers, observations and evidence may change only while the
//! session is `InProgress`. Reopening does not reset any item data.

use fsa_core::{AuditId, AuditItemId, GeoPoint, TemplateId, Timestamp, UnitId};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::item::AuditItem;

/// Status of an audit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Being executed on site.
    InProgress,
    /// Closed with a final score.
    Finalized,
    /// Removed.
    Cancelled,
}

impl AuditStatus {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Finalized => "finalized",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a session status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTransitionRecord {
    /// Status before.
    pub from: AuditStatus,
    /// Status after.
    pub to: AuditStatus,
    /// When it happened.
    pub timestamp: Timestamp,
    /// Why.
    pub reason: String,
}

/// One audit of a unit against a checklist template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSession {
    /// Audit id.
    pub id: AuditId,
    /// Lifecycle status.
    pub status: AuditStatus,
    /// When the audit was started.
    pub started_at: Timestamp,
    /// When it was last finalized.
    pub finished_at: Option<Timestamp>,
    /// Where it was started.
    pub geo: Option<GeoPoint>,
    /// Checklist template (referenced, not owned).
    pub template_id: TemplateId,
    /// Audited unit (referenced, not owned).
    pub unit_id: UnitId,
    /// Activity type of the unit, passed to the AI service.
    pub activity_type: Option<String>,
    /// Checklist items in template order.
    pub items: Vec<AuditItem>,
    /// Score computed by the backend at finalization.
    pub final_score: Option<f64>,
    /// General observations sent with finalize.
    pub general_observations: Option<String>,
    /// Status changes observed by this client.
    #[serde(default)]
    pub transitions: Vec<AuditTransitionRecord>,
}

impl AuditSession {
    /// A new in-progress session.
    pub fn new(
        id: AuditId,
        unit_id: UnitId,
        template_id: TemplateId,
        items: Vec<AuditItem>,
    ) -> Self {
        Self {
            id,
            status: AuditStatus::InProgress,
            started_at: Timestamp::now(),
            finished_at: None,
            geo: None,
            template_id,
            unit_id,
            activity_type: None,
            items,
            final_score: None,
            general_observations: None,
            transitions: Vec::new(),
        }
    }

    /// Whether item data may change.
    pub fn is_editable(&self) -> bool {
        self.status == AuditStatus::InProgress
    }

    /// Fail unless the session is `InProgress`.
    pub fn ensure_editable(&self) -> Result<(), ValidationError> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(ValidationError::SessionNotEditable {
                audit: self.id,
                status: self.status,
            })
        }
    }

    /// Item by id.
    pub fn item(&self, id: AuditItemId) -> Result<&AuditItem, ValidationError> {
        self.items
            .iter()
            .find(|i| i.id == id)
            .ok_or(ValidationError::UnknownItem { item: id })
    }

    /// Mutable item by id.
    pub fn item_mut(&mut self, id: AuditItemId) -> Result<&mut AuditItem, ValidationError> {
        self.items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(ValidationError::UnknownItem { item: id })
    }

    /// Mutable item by id, only while editable.
    pub fn editable_item_mut(
        &mut self,
        id: AuditItemId,
    ) -> Result<&mut AuditItem, ValidationError> {
        self.ensure_editable()?;
        self.item_mut(id)
    }

    /// `InProgress → Finalized`. The mandatory gate is checked by the
    /// controller before the backend is asked to finalize.
    pub fn mark_finalized(
        &mut self,
        final_score: Option<f64>,
        general_observations: Option<String>,
    ) -> Result<(), ValidationError> {
        self.require(AuditStatus::InProgress, AuditStatus::Finalized)?;
        self.final_score = final_score;
        self.general_observations = general_observations;
        self.finished_at = Some(Timestamp::now());
        self.do_transition(AuditStatus::Finalized, "finalized by auditor");
        Ok(())
    }

    /// `Finalized → InProgress`. Item data is kept as is.
    pub fn mark_reopened(&mut self) -> Result<(), ValidationError> {
        self.require(AuditStatus::Finalized, AuditStatus::InProgress)?;
        self.do_transition(AuditStatus::InProgress, "reopened");
        Ok(())
    }

    fn require(&self, expected: AuditStatus, target: AuditStatus) -> Result<(), ValidationError> {
        if self.status != expected {
            return Err(ValidationError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: AuditStatus, reason: &str) {
        self.transitions.push(AuditTransitionRecord {
            from: self.status,
            to,
            timestamp: Timestamp::now(),
            reason: reason.to_string(),
        });
        self.status = to;
    }
}
