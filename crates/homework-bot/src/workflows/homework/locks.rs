use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::domain::CandidateId;

/// Per-candidate in-progress markers shared by the batch runner and the submission listener.
///
/// Entries are created on first use and dropped again once nobody holds or waits for them.
#[derive(Debug, Clone, Default)]
pub struct CandidateLocks {
    slots: Arc<Mutex<HashMap<CandidateId, Arc<AsyncMutex<()>>>>>,
}

/// Held while a candidate is being worked on.
#[derive(Debug)]
pub struct CandidateGuard {
    candidate: CandidateId,
    slots: Arc<Mutex<HashMap<CandidateId, Arc<AsyncMutex<()>>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl CandidateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the candidate unless a cycle for it is already running.
    pub fn try_lock(&self, candidate: CandidateId) -> Option<CandidateGuard> {
        let slot = self.slot(candidate);
        let guard = slot.try_lock_owned().ok()?;
        Some(self.guard(candidate, guard))
    }

    /// Waits until the candidate is free, then claims it.
    pub async fn lock(&self, candidate: CandidateId) -> CandidateGuard {
        let slot = self.slot(candidate);
        let guard = slot.lock_owned().await;
        self.guard(candidate, guard)
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self, candidate: CandidateId) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots
            .get(&candidate)
            .is_some_and(|slot| slot.try_lock().is_err())
    }

    fn slot(&self, candidate: CandidateId) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(candidate).or_default().clone()
    }

    fn guard(&self, candidate: CandidateId, guard: OwnedMutexGuard<()>) -> CandidateGuard {
        CandidateGuard {
            candidate,
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }
}

impl CandidateGuard {
    #[cfg(test)]
    pub(crate) fn candidate(&self) -> CandidateId {
        self.candidate
    }
}

impl Drop for CandidateGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map itself references an idle slot.
        if slots
            .get(&self.candidate)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.candidate);
        }
    }
}
