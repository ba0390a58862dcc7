//! Mandatory-item completeness check controlling finalization.
//!
//! Recomputed from the item list on every call; the session carries no
//! cached flag.

use fsa_core::AuditItemId;

use crate::error::ValidationError;
use crate::session::AuditSession;

/// Mandatory items still answered `NaoAvaliado`, in checklist order.
pub fn missing_mandatory(session: &AuditSession) -> Vec<AuditItemId> {
    session
        .items
        .iter()
        .filter(|i| i.is_mandatory() && !i.is_answered())
        .map(|i| i.id)
        .collect()
}

/// True iff every mandatory item has an answer.
pub fn is_finalize_allowed(session: &AuditSession) -> bool {
    !session
        .items
        .iter()
        .any(|i| i.is_mandatory() && !i.is_answered())
}

/// `Ok` when the gate is open, otherwise the exact count of missing items.
pub(crate) fn check(session: &AuditSession) -> Result<(), ValidationError> {
    let items = missing_mandatory(session);
    if items.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MandatoryIncomplete {
            missing: items.len(),
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{AuditItem, TemplateItem};
    use fsa_core::{Answer, AnswerSet, AuditId, TemplateId, TemplateItemId, UnitId};

    fn session(flags: &[bool]) -> AuditSession {
        let items = flags
            .iter()
            .map(|&mandatory| {
                AuditItem::new(
                    AuditItemId::new(),
                    TemplateItem {
                        id: TemplateItemId::new(),
                        question: "Lixeiras com tampa e pedal?".into(),
                        category: "Resíduos".into(),
                        weight: 1,
                        mandatory,
                        answer_set: AnswerSet::Standard,
                    },
                )
            })
            .collect();
        AuditSession::new(AuditId::new(), UnitId::new(), TemplateId::new(), items)
    }

    #[test]
    fn no_mandatory_items_always_open() {
        let s = session(&[false, false]);
        assert!(is_finalize_allowed(&s));
        assert!(check(&s).is_ok());
    }

    #[test]
    fn empty_session_is_open() {
        assert!(is_finalize_allowed(&session(&[])));
    }

    #[test]
    fn counts_every_unanswered_mandatory_item() {
        let mut s = session(&[true, false, true, true]);
        s.items[2].set_answer(Answer::NaoConforme).unwrap();
        assert!(!is_finalize_allowed(&s));
        let expected = vec![s.items[0].id, s.items[3].id];
        assert_eq!(missing_mandatory(&s), expected);
        assert_eq!(
            check(&s),
            Err(ValidationError::MandatoryIncomplete {
                missing: 2,
                items: expected,
            })
        );
    }

    #[test]
    fn reflects_answer_reset_immediately() {
        let mut s = session(&[true]);
        s.items[0].set_answer(Answer::NaoAplicavel).unwrap();
        assert!(is_finalize_allowed(&s));
        s.items[0].set_answer(Answer::NaoAvaliado).unwrap();
        assert!(!is_finalize_allowed(&s));
    }
}
