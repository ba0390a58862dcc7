//! # Score Aggregation
//!
//! `progress` is the percentage of items carrying an answer, rounded half
//! up. The final score is the backing API's and only stored on the session
//! at finalization; [`ScoreBreakdown::conformity_index`] is a local preview
//! of it, weighted by item criticality.

use fsa_core::Answer;
use serde::{Deserialize, Serialize};

use crate::session::AuditSession;

/// Answered items as a percentage of all items, `0` for an empty checklist.
pub fn progress(session: &AuditSession) -> u8 {
    let total = session.items.len();
    if total == 0 {
        return 0;
    }
    let answered = session.items.iter().filter(|i| i.is_answered()).count();
    // round(answered * 100 / total), half up, in integers.
    let pct = (answered * 200 + total) / (2 * total);
    pct.min(100) as u8
}

/// Answer counts and weights over a session's items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// All items.
    pub total: usize,
    /// `conforme`.
    pub conforme: usize,
    /// `nao_conforme`.
    pub nao_conforme: usize,
    /// `nao_aplicavel`.
    pub nao_aplicavel: usize,
    /// Still unanswered.
    pub nao_avaliado: usize,
    /// Answered with a template-defined option.
    pub custom: usize,
    /// Σ weight over `conforme` items.
    pub conforming_weight: u64,
    /// Σ weight over `conforme` and `nao_conforme` items.
    pub assessed_weight: u64,
}

impl ScoreBreakdown {
    /// Items with any answer.
    pub fn answered(&self) -> usize {
        self.total - self.nao_avaliado
    }

    /// Weighted share of conforming items among those judged conforming or
    /// not, in percent. `None` when nothing has been judged yet.
    pub fn conformity_index(&self) -> Option<f64> {
        if self.assessed_weight == 0 {
            return None;
        }
        Some(self.conforming_weight as f64 * 100.0 / self.assessed_weight as f64)
    }
}

/// Count answers by kind.
pub fn breakdown(session: &AuditSession) -> ScoreBreakdown {
    session
        .items
        .iter()
        .fold(ScoreBreakdown::default(), |mut acc, item| {
            let weight = u64::from(item.template_item.weight);
            acc.total += 1;
            match &item.answer {
                Answer::Conforme => {
                    acc.conforme += 1;
                    acc.conforming_weight += weight;
                    acc.assessed_weight += weight;
                }
                Answer::NaoConforme => {
                    acc.nao_conforme += 1;
                    acc.assessed_weight += weight;
                }
                Answer::NaoAplicavel => acc.nao_aplicavel += 1,
                Answer::NaoAvaliado => acc.nao_avaliado += 1,
                Answer::Custom(_) => acc.custom += 1,
            }
            acc
        })
}
