//! # Checklist Answers
//!
//! An item's answer is a tagged value: one of the four fixed verdicts, or an
//! option string from the template's custom answer list. `NaoAvaliado` is
//! the unanswered state every item starts in.
//!
//! On the wire an answer is its plain string (`"conforme"`, `"nao_conforme"`,
//! `"nao_aplicavel"`, `"nao_avaliado"`, or the custom option verbatim).
//!
//! Which answers an item accepts is decided by its `AnswerSet`:
//!
//! ```text
//! Standard        conforme | nao_conforme | nao_aplicavel | nao_avaliado
//! Custom(opts)    any of opts            |                 nao_avaliado
//! ```

use serde::{Deserialize, Serialize};

const CONFORME: &str = "conforme";
const NAO_CONFORME: &str = "nao_conforme";
const NAO_APLICAVEL: &str = "nao_aplicavel";
const NAO_AVALIADO: &str = "nao_avaliado";

/// The answer recorded for a checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Answer {
    /// Item complies.
    Conforme,
    /// Item does not comply.
    NaoConforme,
    /// Item does not apply to this unit.
    NaoAplicavel,
    /// Item not evaluated yet.
    NaoAvaliado,
    /// One of the template's custom answer options.
    Custom(String),
}

impl Answer {
    /// Build an answer from its wire string. Unknown strings become `Custom`.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            CONFORME => Self::Conforme,
            NAO_CONFORME => Self::NaoConforme,
            NAO_APLICAVEL => Self::NaoAplicavel,
            NAO_AVALIADO | "" => Self::NaoAvaliado,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Conforme => CONFORME,
            Self::NaoConforme => NAO_CONFORME,
            Self::NaoAplicavel => NAO_APLICAVEL,
            Self::NaoAvaliado => NAO_AVALIADO,
            Self::Custom(option) => option,
        }
    }

    /// Whether the item still counts as unanswered.
    pub fn is_unanswered(&self) -> bool {
        matches!(self, Self::NaoAvaliado)
    }
}

impl Default for Answer {
    fn default() -> Self {
        Self::NaoAvaliado
    }
}

impl From<String> for Answer {
    fn from(raw: String) -> Self {
        Self::from_wire(&raw)
    }
}

impl From<Answer> for String {
    fn from(answer: Answer) -> Self {
        answer.as_str().to_string()
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of answers an item accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "options", rename_all = "snake_case")]
pub enum AnswerSet {
    /// The fixed four-state verdict set.
    #[default]
    Standard,
    /// Template-defined options (`usarRespostasPersonalizadas`).
    Custom(Vec<String>),
}

impl AnswerSet {
    /// Build from the template flags. An enabled custom set with no options
    /// falls back to the standard set.
    pub fn from_template(use_custom: bool, options: Vec<String>) -> Self {
        let options: Vec<String> = options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if use_custom && !options.is_empty() {
            Self::Custom(options)
        } else {
            Self::Standard
        }
    }

    /// Whether `answer` is a member of this set. Resetting to unanswered is
    /// always allowed.
    pub fn allows(&self, answer: &Answer) -> bool {
        if answer.is_unanswered() {
            return true;
        }
        match self {
            Self::Standard => !matches!(answer, Answer::Custom(_)),
            Self::Custom(options) => options.iter().any(|o| o == answer.as_str()),
        }
    }

    /// Answers selectable by the auditor, in display order.
    pub fn choices(&self) -> Vec<Answer> {
        match self {
            Self::Standard => vec![Answer::Conforme, Answer::NaoConforme, Answer::NaoAplicavel],
            Self::Custom(options) => options.iter().map(|o| Answer::from_wire(o)).collect(),
        }
    }
}
