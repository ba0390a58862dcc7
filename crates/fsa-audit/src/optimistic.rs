//! Shared session state and the apply → confirm-or-revert step used by
//! every operation that changes the session before a collaborator call.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{AuditError, Operation};
use crate::ports::PortError;
use crate::session::AuditSession;

/// The session behind a synchronous lock. The guard never crosses an
/// `.await`; callers use [`SessionCell::with`].
#[derive(Debug, Clone)]
pub(crate) struct SessionCell(Arc<Mutex<AuditSession>>);

impl SessionCell {
    pub(crate) fn new(session: AuditSession) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// Run `f` with exclusive access to the session.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut AuditSession) -> R) -> R {
        let mut guard = self.0.lock();
        f(&mut guard)
    }

    /// Copy of the current session.
    pub(crate) fn snapshot(&self) -> AuditSession {
        self.0.lock().clone()
    }
}

/// Apply a local change, confirm it with a collaborator, and undo it if the
/// collaborator fails.
///
/// `apply` validates and mutates the session, returning an undo token and
/// the payload for `confirm`. A validation failure leaves the session as it
/// was and `confirm` is never called. On a collaborator failure `revert`
/// receives the undo token and the error is returned as
/// [`AuditError::Collaborator`].
pub(crate) async fn apply_confirm_or_revert<U, P, T, Fut>(
    cell: &SessionCell,
    operation: Operation,
    apply: impl FnOnce(&mut AuditSession) -> Result<(U, P), AuditError>,
    confirm: impl FnOnce(P) -> Fut,
    revert: impl FnOnce(&mut AuditSession, U),
) -> Result<T, AuditError>
where
    Fut: Future<Output = Result<T, PortError>>,
{
    let (undo, payload) = cell.with(apply)?;
    match confirm(payload).await {
        Ok(value) => Ok(value),
        Err(source) => {
            let audit_id = cell.with(|s| {
                revert(s, undo);
                s.id
            });
            tracing::warn!(
                audit_id = %audit_id,
                operation = %operation,
                error = %source,
                "collaborator call failed; local change rolled back"
            );
            Err(AuditError::collaborator(operation, source))
        }
    }
}
