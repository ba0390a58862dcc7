//! # Session Report
//!
//! Summary of an audit session as printed by `fsa audit show` and after
//! every mutating subcommand: progress, the mandatory gate, evidence still
//! in flight, and the answer breakdown.

use fsa_audit::{
    gate, score, AnalysisStatus, AuditSession, AuditStatus, EvidenceStage, ScoreBreakdown,
};
use serde::Serialize;

/// A mandatory item still blocking finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingItem {
    pub id: String,
    pub question: String,
}

/// Printable view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub audit_id: String,
    pub status: AuditStatus,
    pub progress: u8,
    pub finalize_allowed: bool,
    pub missing_mandatory: Vec<PendingItem>,
    pub evidence_in_flight: usize,
    /// Photos whose upload or analysis failed.
    pub evidence_failed: usize,
    pub breakdown: ScoreBreakdown,
    pub conformity_preview: Option<f64>,
    pub final_score: Option<f64>,
}

impl SessionReport {
    /// Summarize a session snapshot.
    pub fn of(session: &AuditSession) -> Self {
        let missing = gate::missing_mandatory(session);
        let missing_mandatory = session
            .items
            .iter()
            .filter(|item| missing.contains(&item.id))
            .map(|item| PendingItem {
                id: item.id.as_uuid().to_string(),
                question: item.template_item.question.clone(),
            })
            .collect();
        let evidence = session.items.iter().flat_map(|item| item.evidence.iter());
        let (in_flight, failed) = evidence.fold((0, 0), |(in_flight, failed), e| {
            (
                in_flight + usize::from(e.is_in_flight()),
                failed
                    + usize::from(
                        e.stage() == EvidenceStage::Failed || e.analysis == AnalysisStatus::Failed,
                    ),
            )
        });
        let breakdown = score::breakdown(session);

        Self {
            audit_id: session.id.as_uuid().to_string(),
            status: session.status,
            progress: score::progress(session),
            finalize_allowed: gate::is_finalize_allowed(session),
            missing_mandatory,
            evidence_in_flight: in_flight,
            evidence_failed: failed,
            conformity_preview: breakdown.conformity_index(),
            breakdown,
            final_score: session.final_score,
        }
    }

    /// Human-readable rendering.
    pub fn render(&self) -> String {
        let b = &self.breakdown;
        let mut out = format!(
            "Audit {}  [{}]\nProgress: {}% ({}/{} answered)\n",
            self.audit_id,
            self.status,
            self.progress,
            b.answered(),
            b.total
        );
        out.push_str(&format!(
            "  conforme {}  nao_conforme {}  nao_aplicavel {}  custom {}  nao_avaliado {}\n",
            b.conforme, b.nao_conforme, b.nao_aplicavel, b.custom, b.nao_avaliado
        ));
        if let Some(preview) = self.conformity_preview {
            out.push_str(&format!("Conformity preview: {preview:.1}%\n"));
        }
        if let Some(score) = self.final_score {
            out.push_str(&format!("Final score: {score:.1}\n"));
        }
        if self.evidence_in_flight > 0 || self.evidence_failed > 0 {
            out.push_str(&format!(
                "Evidence: {} in flight, {} failed\n",
                self.evidence_in_flight, self.evidence_failed
            ));
        }
        if self.finalize_allowed {
            out.push_str("Ready to finalize.\n");
        } else {
            out.push_str(&format!(
                "{} mandatory item(s) unanswered:\n",
                self.missing_mandatory.len()
            ));
            for item in &self.missing_mandatory {
                out.push_str(&format!("  - {}  {}\n", item.id, item.question));
            }
        }
        out
    }
}
