//! Shared queue of pending decisions.
//!
//! REASONING appends from concurrent provider calls; RISK_CHECK copies the
//! queue under the lock, evaluates outside it, and writes the result back
//! under the lock. The lock is never held across an await.

use std::sync::Arc;

use ooda_core::{Decision, DecisionId};
use parking_lot::Mutex;

#[derive(Debug, Clone, Default)]
pub struct PendingDecisions {
    inner: Arc<Mutex<Vec<Decision>>>,
}

impl PendingDecisions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, decision: Decision) {
        self.inner.lock().push(decision);
    }

    /// Copy of the queue in append order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Decision> {
        self.inner.lock().clone()
    }

    /// Remove `processed` and put `survivors` back at the front.
    ///
    /// Decisions appended since the snapshot was taken are kept, after the
    /// survivors, so append order is preserved.
    pub fn write_back(&self, processed: &[DecisionId], survivors: Vec<Decision>) {
        let mut queue = self.inner.lock();
        queue.retain(|d| !processed.contains(&d.id));
        let appended = std::mem::take(&mut *queue);
        queue.extend(survivors);
        queue.extend(appended);
    }

    pub fn clear(&self) -> usize {
        let mut queue = self.inner.lock();
        let n = queue.len();
        queue.clear();
        n
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
