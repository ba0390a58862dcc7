//! Item Response Manager: answer and observation changes, applied locally
//! first and then persisted through `responderItem`.

use std::sync::Arc;

use fsa_core::{Answer, AuditItemId};

use crate::error::{AuditError, Operation};
use crate::optimistic::{apply_confirm_or_revert, SessionCell};
use crate::ports::{AuditBackend, ResponseExtras};

pub(crate) struct ItemResponseManager {
    cell: SessionCell,
    backend: Arc<dyn AuditBackend>,
}

impl ItemResponseManager {
    pub(crate) fn new(cell: SessionCell, backend: Arc<dyn AuditBackend>) -> Self {
        Self { cell, backend }
    }

    /// Set an item's answer. The previous answer is restored if the backend
    /// rejects the save, unless a later change already replaced it.
    pub(crate) async fn set_answer(
        &self,
        item: AuditItemId,
        answer: Answer,
    ) -> Result<(), AuditError> {
        let backend = &self.backend;
        let applied = answer.clone();
        apply_confirm_or_revert(
            &self.cell,
            Operation::SaveAnswer,
            |s| {
                let audit = s.id;
                let previous = s.editable_item_mut(item)?.set_answer(answer.clone())?;
                Ok((previous, (audit, answer)))
            },
            |(audit, answer)| async move {
                backend
                    .save_response(audit, item, &answer, &ResponseExtras::default())
                    .await
            },
            |s, previous| {
                if let Ok(it) = s.item_mut(item) {
                    if it.answer == applied {
                        it.answer = previous;
                    }
                }
            },
        )
        .await?;
        tracing::info!(item_id = %item, answer = %applied, "answer saved");
        Ok(())
    }

    /// Close the item's documentation: store the observation and persist it
    /// with the current answer and AI-derived fields.
    pub(crate) async fn save_observation(
        &self,
        item: AuditItemId,
        text: &str,
    ) -> Result<(), AuditError> {
        let backend = &self.backend;
        let applied = text.trim().to_string();
        apply_confirm_or_revert(
            &self.cell,
            Operation::SaveObservation,
            |s| {
                let audit = s.id;
                let it = s.editable_item_mut(item)?;
                let observation = it.ensure_documentation_closable(text)?;
                let previous = it.observation.replace(observation);
                Ok((previous, (audit, it.answer.clone(), it.response_extras())))
            },
            |(audit, answer, extras)| async move {
                backend.save_response(audit, item, &answer, &extras).await
            },
            |s, previous| {
                if let Ok(it) = s.item_mut(item) {
                    if it.observation.as_deref() == Some(applied.as_str()) {
                        it.observation = previous;
                    }
                }
            },
        )
        .await?;
        tracing::info!(item_id = %item, "item documentation saved");
        Ok(())
    }
}
