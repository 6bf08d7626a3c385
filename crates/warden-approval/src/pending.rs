//! The table of requests waiting for a human.
//!
//! [`PendingTable::remove`] is the single resolution point: whichever of the
//! human response or the timeout removes an entry first owns its outcome,
//! and the loser finds nothing.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::warn;
use warden_core::{RiskLevel, Timestamp, ToolCallRequest};

use crate::request::{PendingRequest, RequestId, UserChoice};

/// What the human answered.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UserResponse {
    pub(crate) approved: bool,
    pub(crate) choice: Option<UserChoice>,
}

pub(crate) struct PendingApproval {
    pub(crate) request: ToolCallRequest,
    pub(crate) risk_level: RiskLevel,
    pub(crate) created_at: Timestamp,
    pub(crate) deadline: Timestamp,
    pub(crate) responder: oneshot::Sender<UserResponse>,
}

impl PendingApproval {
    fn summary(&self, request_id: RequestId) -> PendingRequest {
        PendingRequest {
            request_id,
            tool: self.request.tool.clone(),
            params: self.request.params.clone(),
            risk_level: self.risk_level,
            created_at: self.created_at,
            deadline: self.deadline,
        }
    }
}

#[derive(Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<RequestId, PendingApproval>>,
}

impl PendingTable {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestId, PendingApproval>> {
        self.entries.lock().unwrap_or_else(|e| {
            warn!("PendingTable lock poisoned, recovering");
            PoisonError::into_inner(e)
        })
    }

    pub(crate) fn insert(&self, id: RequestId, pending: PendingApproval) {
        self.lock().insert(id, pending);
    }

    pub(crate) fn remove(&self, id: &RequestId) -> Option<PendingApproval> {
        self.lock().remove(id)
    }

    pub(crate) fn contains(&self, id: &RequestId) -> bool {
        self.lock().contains_key(id)
    }

    pub(crate) fn summaries(&self) -> Vec<PendingRequest> {
        let mut list: Vec<PendingRequest> = self
            .lock()
            .iter()
            .map(|(id, p)| p.summary(*id))
            .collect();
        list.sort_by_key(|p| p.created_at);
        list
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Removes a pending entry when the waiting future is dropped, so a
/// cancelled `evaluate` never leaves an unanswerable request behind.
pub(crate) struct PendingCleanup<'a> {
    pub(crate) table: &'a PendingTable,
    pub(crate) id: RequestId,
}

impl Drop for PendingCleanup<'_> {
    fn drop(&mut self) {
        self.table.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> (PendingApproval, oneshot::Receiver<UserResponse>) {
        let (tx, rx) = oneshot::channel();
        let now = Timestamp::now();
        (
            PendingApproval {
                request: ToolCallRequest::new("t", json!({})),
                risk_level: RiskLevel::High,
                created_at: now,
                deadline: now,
                responder: tx,
            },
            rx,
        )
    }

    #[test]
    fn test_remove_resolves_once() {
        let table = PendingTable::default();
        let id = RequestId::new();
        let (pending, _rx) = entry();
        table.insert(id, pending);

        assert!(table.contains(&id));
        assert!(table.remove(&id).is_some());
        assert!(table.remove(&id).is_none());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_cleanup_guard_removes_on_drop() {
        let table = PendingTable::default();
        let id = RequestId::new();
        let (pending, _rx) = entry();
        table.insert(id, pending);
        {
            let _guard = PendingCleanup { table: &table, id };
            assert_eq!(table.summaries().len(), 1);
        }
        assert_eq!(table.len(), 0);
    }
}
