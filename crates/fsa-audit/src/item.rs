//! # Checklist Items
//!
//! An `AuditItem` is one question of the template instantiated inside an
//! audit session: its answer, the auditor's observation, the AI-derived
//! finding fields and the attached evidence.
//!
//! The methods here are the synchronous half of the Item Response Manager:
//! they validate and apply a change and hand back what is needed to undo
//! it. The async half (`responses.rs`, `pipeline.rs`) confirms the change
//! with the collaborators.

use fsa_core::{Answer, AnswerSet, AuditItemId, EvidenceKey, TemplateItemId};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::evidence::Evidence;
use crate::ports::{GeneratedText, ImageAnnotation, ResponseExtras};

/// The template question an item was instantiated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateItem {
    /// Template question id.
    pub id: TemplateItemId,
    /// Question text (`pergunta`).
    pub question: String,
    /// Category (`categoria`).
    pub category: String,
    /// Criticality weight used by the score preview.
    pub weight: u32,
    /// Whether the item gates finalization.
    pub mandatory: bool,
    /// Allowed answers.
    pub answer_set: AnswerSet,
}

/// A checklist item inside an audit session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditItem {
    /// Item id.
    pub id: AuditItemId,
    /// Source question.
    pub template_item: TemplateItem,
    /// Current answer; `NaoAvaliado` until set.
    pub answer: Answer,
    /// Auditor observation.
    pub observation: Option<String>,
    /// AI description of the finding.
    pub ai_description: Option<String>,
    /// AI non-conformity classification.
    pub non_conformity: Option<String>,
    /// Legal reference for the finding.
    pub legal_reference: Option<String>,
    /// Suggested corrective actions, one per line.
    pub corrective_actions: Option<String>,
    /// Attached photos, in selection order.
    pub evidence: Vec<Evidence>,
}

impl AuditItem {
    /// A new, unanswered item.
    pub fn new(id: AuditItemId, template_item: TemplateItem) -> Self {
        Self {
            id,
            template_item,
            answer: Answer::NaoAvaliado,
            observation: None,
            ai_description: None,
            non_conformity: None,
            legal_reference: None,
            corrective_actions: None,
            evidence: Vec::new(),
        }
    }

    /// Whether the item has an answer other than `NaoAvaliado`.
    pub fn is_answered(&self) -> bool {
        !self.answer.is_unanswered()
    }

    /// Whether the item gates finalization.
    pub fn is_mandatory(&self) -> bool {
        self.template_item.mandatory
    }

    /// Replace the answer, returning the previous one.
    pub fn set_answer(&mut self, answer: Answer) -> Result<Answer, ValidationError> {
        if !self.template_item.answer_set.allows(&answer) {
            return Err(ValidationError::AnswerNotAllowed {
                item: self.id,
                answer: answer.to_string(),
            });
        }
        Ok(std::mem::replace(&mut self.answer, answer))
    }

    /// Check that a new photo may be selected: the item is answered and
    /// below the cap. In-flight entries count towards the cap.
    pub fn ensure_accepts_evidence(&self, cap: usize) -> Result<(), ValidationError> {
        if !self.is_answered() {
            return Err(ValidationError::ItemUnanswered { item: self.id });
        }
        if self.evidence.len() >= cap {
            return Err(ValidationError::EvidenceCapReached { item: self.id, cap });
        }
        Ok(())
    }

    /// Number of evidence entries whose store or AI call has not settled.
    pub fn in_flight_count(&self) -> usize {
        self.evidence.iter().filter(|e| e.is_in_flight()).count()
    }

    /// Evidence by key.
    pub fn evidence(&self, key: EvidenceKey) -> Option<&Evidence> {
        self.evidence.iter().find(|e| e.key == key)
    }

    /// Mutable evidence by key.
    pub fn evidence_mut(&mut self, key: EvidenceKey) -> Option<&mut Evidence> {
        self.evidence.iter_mut().find(|e| e.key == key)
    }

    /// Detach evidence, returning it with its former position.
    pub fn take_evidence(&mut self, key: EvidenceKey) -> Option<(usize, Evidence)> {
        let pos = self.evidence.iter().position(|e| e.key == key)?;
        Some((pos, self.evidence.remove(pos)))
    }

    /// Put detached evidence back where it was.
    pub fn restore_evidence(&mut self, pos: usize, evidence: Evidence) {
        let pos = pos.min(self.evidence.len());
        self.evidence.insert(pos, evidence);
    }

    /// Validate that the documentation session can be closed with `text`.
    /// Returns the trimmed observation.
    pub fn ensure_documentation_closable(&self, text: &str) -> Result<String, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyObservation { item: self.id });
        }
        let pending = self.in_flight_count();
        if pending > 0 {
            return Err(ValidationError::EvidenceInFlight {
                item: self.id,
                pending,
            });
        }
        Ok(text.to_string())
    }

    /// Overwrite the AI-derived fields with the latest photo annotation.
    /// The last annotation to arrive wins, even when an earlier one was
    /// more severe.
    pub fn merge_annotation(&mut self, annotation: &ImageAnnotation) {
        self.ai_description = Some(annotation.description.clone());
        self.non_conformity = annotation.non_conformity.clone();
        self.legal_reference = annotation.legal_reference.clone();
        self.corrective_actions = join_actions(&annotation.suggestions);
    }

    /// Overwrite the AI-derived fields with a drafted finding.
    pub fn merge_generated_text(&mut self, text: &GeneratedText) {
        self.ai_description = Some(text.technical_description.clone());
        if text.legal_reference.is_some() {
            self.legal_reference = text.legal_reference.clone();
        }
        self.corrective_actions = join_actions(&text.corrective_actions);
    }

    /// Documentation fields sent with `responderItem` when the item's
    /// documentation is saved.
    pub fn response_extras(&self) -> ResponseExtras {
        ResponseExtras {
            observation: self.observation.clone(),
            ai_description: self.ai_description.clone(),
            non_conformity: self.non_conformity.clone(),
            legal_reference: self.legal_reference.clone(),
            corrective_actions: self.corrective_actions.clone(),
        }
    }
}

fn join_actions(actions: &[String]) -> Option<String> {
    let lines: Vec<&str> = actions
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{ImageData, Severity};

    fn template(mandatory: bool, answer_set: AnswerSet) -> TemplateItem {
        TemplateItem {
            id: TemplateItemId::new(),
            question: "Os alimentos estão armazenados a temperatura adequada?".into(),
            category: "Armazenamento".into(),
            weight: 3,
            mandatory,
            answer_set,
        }
    }

    fn item() -> AuditItem {
        AuditItem::new(AuditItemId::new(), template(true, AnswerSet::Standard))
    }

    #[test]
    fn starts_unanswered() {
        let it = item();
        assert!(!it.is_answered());
        assert!(it.is_mandatory());
        assert!(it.evidence.is_empty());
    }

    #[test]
    fn set_answer_returns_previous() {
        let mut it = item();
        let prev = it.set_answer(Answer::NaoConforme).unwrap();
        assert_eq!(prev, Answer::NaoAvaliado);
        let prev = it.set_answer(Answer::Conforme).unwrap();
        assert_eq!(prev, Answer::NaoConforme);
        assert!(it.is_answered());
    }

    #[test]
    fn set_answer_rejects_foreign_value_without_change() {
        let mut it = AuditItem::new(
            AuditItemId::new(),
            template(false, AnswerSet::Custom(vec!["Sim".into(), "Não".into()])),
        );
        let err = it.set_answer(Answer::Conforme).unwrap_err();
        assert!(matches!(err, ValidationError::AnswerNotAllowed { .. }));
        assert_eq!(it.answer, Answer::NaoAvaliado);
        it.set_answer(Answer::Custom("Sim".into())).unwrap();
        assert!(it.is_answered());
    }

    #[test]
    fn evidence_refused_while_unanswered() {
        let it = item();
        assert_eq!(
            it.ensure_accepts_evidence(5),
            Err(ValidationError::ItemUnanswered { item: it.id })
        );
    }

    #[test]
    fn evidence_cap_counts_all_entries() {
        let mut it = item();
        it.set_answer(Answer::NaoConforme).unwrap();
        let img = ImageData::new("x.jpg", "image/jpeg", vec![1u8]);
        for _ in 0..5 {
            it.evidence.push(Evidence::selected(&img));
        }
        assert_eq!(
            it.ensure_accepts_evidence(5),
            Err(ValidationError::EvidenceCapReached { item: it.id, cap: 5 })
        );
    }

    #[test]
    fn take_and_restore_keep_position() {
        let mut it = item();
        let img = ImageData::new("x.jpg", "image/jpeg", vec![1u8]);
        for _ in 0..3 {
            it.evidence.push(Evidence::selected(&img));
        }
        let middle = it.evidence[1].key;
        let (pos, ev) = it.take_evidence(middle).unwrap();
        assert_eq!(pos, 1);
        assert_eq!(it.evidence.len(), 2);
        it.restore_evidence(pos, ev);
        assert_eq!(it.evidence[1].key, middle);
    }

    #[test]
    fn documentation_requires_text_and_settled_evidence() {
        let mut it = item();
        assert!(matches!(
            it.ensure_documentation_closable("   "),
            Err(ValidationError::EmptyObservation { .. })
        ));
        let img = ImageData::new("x.jpg", "image/jpeg", vec![1u8]);
        it.evidence.push(Evidence::selected(&img));
        assert!(matches!(
            it.ensure_documentation_closable("ok"),
            Err(ValidationError::EvidenceInFlight { pending: 1, .. })
        ));
        it.evidence.clear();
        assert_eq!(it.ensure_documentation_closable("  ok  ").unwrap(), "ok");
    }

    #[test]
    fn merge_annotation_overwrites_previous_finding() {
        let mut it = item();
        it.merge_annotation(&ImageAnnotation {
            relevant: true,
            description: "Alimento exposto sem proteção".into(),
            non_conformity: Some("contaminação cruzada".into()),
            severity: Some(Severity::Critica),
            legal_reference: Some("RDC 216/2004 item 4.8".into()),
            suggestions: vec!["Cobrir alimentos".into(), " ".into(), "Treinar equipe".into()],
        });
        assert_eq!(
            it.corrective_actions.as_deref(),
            Some("Cobrir alimentos\nTreinar equipe")
        );

        it.merge_annotation(&ImageAnnotation {
            relevant: true,
            description: "Bancada limpa".into(),
            non_conformity: None,
            severity: Some(Severity::Baixa),
            legal_reference: None,
            suggestions: vec![],
        });
        assert_eq!(it.ai_description.as_deref(), Some("Bancada limpa"));
        assert!(it.non_conformity.is_none());
        assert!(it.corrective_actions.is_none());
    }

    #[test]
    fn generated_text_keeps_legal_reference_when_absent() {
        let mut it = item();
        it.legal_reference = Some("Portaria CVS 5/2013".into());
        it.merge_generated_text(&GeneratedText {
            technical_description: "Ausência de controle de temperatura".into(),
            legal_reference: None,
            corrective_actions: vec!["Instalar planilha de registro".into()],
        });
        assert_eq!(it.legal_reference.as_deref(), Some("Portaria CVS 5/2013"));
        assert_eq!(
            it.response_extras().corrective_actions.as_deref(),
            Some("Instalar planilha de registro")
        );
    }
}
