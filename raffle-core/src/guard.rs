//! Per-requester mutual exclusion for draws.
//!
//! At most one draw may be in flight for a given requester; different
//! requesters draw concurrently. The mark is held by a [`DrawPermit`] and
//! cleared when the permit is dropped, so every exit path of a draw task
//! (success, failure, cancellation, abort) releases it. While held, the
//! draw's cancel handle is reachable by requester, so any session of that
//! requester can stop it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use compact_str::CompactString;

use crate::orchestrator::CancelHandle;

/// Opaque identity of whoever asked for a draw.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequesterId(CompactString);

impl RequesterId {
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequesterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifies one draw among all draws started by a guard.
pub type DrawId = u64;

#[derive(Debug)]
struct ActiveDraw {
    id: DrawId,
    cancel: CancelHandle,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: DrawId,
    draws: HashMap<RequesterId, ActiveDraw>,
}

type SharedRegistry = Arc<Mutex<Registry>>;

fn lock(registry: &SharedRegistry) -> MutexGuard<'_, Registry> {
    // The map stays consistent even if a holder panicked: inserts and
    // removes are single operations.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default)]
pub struct DrawSessionGuard {
    registry: SharedRegistry,
}

impl DrawSessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `requester` busy and return a permit, or `None` without side
    /// effects if a draw is already active for it.
    ///
    /// `cancel` stays reachable through [`DrawSessionGuard::cancel`] until
    /// the permit is dropped.
    pub fn try_acquire(
        &self,
        requester: &RequesterId,
        cancel: CancelHandle,
    ) -> Option<DrawPermit> {
        let mut registry = lock(&self.registry);
        if registry.draws.contains_key(requester) {
            return None;
        }
        registry.next_id = registry.next_id.wrapping_add(1);
        let id = registry.next_id;
        registry
            .draws
            .insert(requester.clone(), ActiveDraw { id, cancel });
        Some(DrawPermit {
            requester: requester.clone(),
            id,
            registry: Arc::clone(&self.registry),
        })
    }

    /// Cancel whatever draw `requester` has running. Returns `false` if none.
    pub fn cancel(&self, requester: &RequesterId) -> bool {
        match lock(&self.registry).draws.get(requester) {
            Some(draw) => {
                draw.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel the draw `id` if it is still the one running for `requester`.
    pub fn cancel_draw(&self, requester: &RequesterId, id: DrawId) -> bool {
        match lock(&self.registry).draws.get(requester) {
            Some(draw) if draw.id == id => {
                draw.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, requester: &RequesterId) -> bool {
        lock(&self.registry).draws.contains_key(requester)
    }

    pub fn active_count(&self) -> usize {
        lock(&self.registry).draws.len()
    }
}

/// Proof that a draw is active for one requester.
#[derive(Debug)]
pub struct DrawPermit {
    requester: RequesterId,
    id: DrawId,
    registry: SharedRegistry,
}

impl DrawPermit {
    pub fn requester(&self) -> &RequesterId {
        &self.requester
    }

    pub fn id(&self) -> DrawId {
        self.id
    }

    /// Release the mark now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DrawPermit {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        if registry
            .draws
            .get(&self.requester)
            .is_some_and(|draw| draw.id == self.id)
        {
            registry.draws.remove(&self.requester);
        }
    }
}
