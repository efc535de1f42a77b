//! Focus stack
//!
//! Ordered sequence of granted requests; the last element is the top and
//! holds the current focus. Owned exclusively by the arbiter and only
//! touched under its lock.
//!
//! Invariants:
//! - no two holders share a `FocusRequestId`
//! - removing any holder keeps the relative order of the others

use super::request::{FocusRequest, FocusRequestId};
use focus_common::events::{FocusChange, FocusGain};
use std::sync::{Arc, Mutex, PoisonError};

/// Last focus change delivered to a holder's listener
///
/// Written on the holder's execution context after the listener returns.
/// Observation only; arbitration never reads it.
#[derive(Debug, Clone, Default)]
pub struct DeliveredState(Arc<Mutex<Option<FocusChange>>>);

impl DeliveredState {
    pub fn get(&self) -> Option<FocusChange> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set(&self, change: FocusChange) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(change);
    }
}

/// A request that has been granted
#[derive(Debug, Clone)]
pub struct FocusHolder {
    request: FocusRequest,
    last_delivered: DeliveredState,
    granted_at: chrono::DateTime<chrono::Utc>,
}

impl FocusHolder {
    pub fn new(request: FocusRequest) -> Self {
        Self {
            request,
            last_delivered: DeliveredState::default(),
            granted_at: chrono::Utc::now(),
        }
    }

    pub fn id(&self) -> FocusRequestId {
        self.request.id()
    }

    pub fn request(&self) -> &FocusRequest {
        &self.request
    }

    pub fn gain(&self) -> FocusGain {
        self.request.gain()
    }

    pub fn last_delivered(&self) -> &DeliveredState {
        &self.last_delivered
    }

    pub fn granted_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.granted_at
    }

    /// Same holder re-requested: keep the delivered state, take the new request
    fn regranted(self, request: FocusRequest) -> Self {
        Self {
            request,
            last_delivered: self.last_delivered,
            granted_at: chrono::Utc::now(),
        }
    }
}

/// Ordered stack of focus holders
#[derive(Debug, Default)]
pub struct FocusRegistry {
    /// Bottom first, top last
    holders: Vec<FocusHolder>,
}

impl FocusRegistry {
    pub fn new() -> Self {
        Self {
            holders: Vec::new(),
        }
    }

    /// Put a request on top
    ///
    /// A request already present is moved to the top (keeping its delivered
    /// state) instead of being duplicated.
    pub fn push(&mut self, request: FocusRequest) -> &FocusHolder {
        let holder = match self.position(request.id()) {
            Some(index) => self.holders.remove(index).regranted(request),
            None => FocusHolder::new(request),
        };
        self.holders.push(holder);
        &self.holders[self.holders.len() - 1]
    }

    /// Remove a holder wherever it sits
    ///
    /// Returns the holder and whether it was the top.
    pub fn remove(&mut self, id: FocusRequestId) -> Option<(FocusHolder, bool)> {
        let index = self.position(id)?;
        let was_top = index + 1 == self.holders.len();
        Some((self.holders.remove(index), was_top))
    }

    pub fn top(&self) -> Option<&FocusHolder> {
        self.holders.last()
    }

    /// Holder directly beneath `id` in the stack
    pub fn holder_below(&self, id: FocusRequestId) -> Option<&FocusHolder> {
        let index = self.position(id)?;
        index.checked_sub(1).map(|below| &self.holders[below])
    }

    pub fn get(&self, id: FocusRequestId) -> Option<&FocusHolder> {
        self.holders.iter().find(|h| h.id() == id)
    }

    pub fn contains(&self, id: FocusRequestId) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Holders from top to bottom
    pub fn iter_top_down(&self) -> impl Iterator<Item = &FocusHolder> {
        self.holders.iter().rev()
    }

    /// Drop every holder, returning them top first
    pub fn clear(&mut self) -> Vec<FocusHolder> {
        let mut drained: Vec<FocusHolder> = self.holders.drain(..).collect();
        drained.reverse();
        drained
    }

    fn position(&self, id: FocusRequestId) -> Option<usize> {
        self.holders.iter().position(|h| h.id() == id)
    }
}
