//! # Context Propagation Slot
//!
//! Holds the ambient scheduling context for a fan-out scope. The request-handling layer
//! owns the slot and sets it while it dispatches a batch of sub-invocations; the PROMISE
//! and TASK adapters only read it, to decide whether a new async unit joins the ambient
//! plan or starts a plan of its own.
//!
//! The slot is passed explicitly (see [`MethodInvoker::invoke_in`](crate::MethodInvoker::invoke_in))
//! instead of living in thread-local storage, so a value can never leak into an unrelated
//! invocation that happens to run later on the same worker thread.

use crate::engine::PlanContext;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct ContextSlot {
    current: RwLock<Option<PlanContext>>,
}

impl ContextSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `plan` as the ambient context until the returned scope is dropped.
    /// Dropping the scope restores whatever was set before, so scopes nest.
    #[must_use = "the ambient context is cleared as soon as the scope is dropped"]
    pub fn enter(&self, plan: PlanContext) -> SlotScope<'_> {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(plan);
        SlotScope {
            slot: self,
            previous,
        }
    }

    /// The ambient context, if a scope is active.
    pub fn current(&self) -> Option<PlanContext> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Guard returned by [`ContextSlot::enter`].
pub struct SlotScope<'a> {
    slot: &'a ContextSlot,
    previous: Option<PlanContext>,
}

impl Drop for SlotScope<'_> {
    fn drop(&mut self) {
        *self
            .slot
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TokioEngine;

    #[tokio::test]
    async fn scopes_nest_and_restore() {
        let engine = TokioEngine::current().unwrap();
        let slot = ContextSlot::new();
        assert!(slot.current().is_none());

        let outer = engine.plan("outer");
        let inner = engine.plan("inner");
        {
            let _outer = slot.enter(outer.clone());
            assert_eq!(slot.current().map(|p| p.id()), Some(outer.id()));
            {
                let _inner = slot.enter(inner.clone());
                assert_eq!(slot.current().map(|p| p.id()), Some(inner.id()));
            }
            assert_eq!(slot.current().map(|p| p.id()), Some(outer.id()));
        }
        assert!(slot.current().is_none());
    }
}
