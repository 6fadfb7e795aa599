//! Session-wide reasoning mode and per-query overrides.
//!
//! The connection carries one ambient [`ReasoningMode`]. A query may override
//! it for its own duration through a [`ReasoningScope`], which snapshots the
//! ambient mode, applies the override, and restores the snapshot when the
//! scope is dropped, whether the wrapped dispatch succeeded, failed, or was
//! abandoned.
//!
//! Overrides are serialized through a gate: a scope holds the gate
//! exclusively, while unscoped queries and ambient updates hold it shared or
//! exclusively respectively. An override therefore never leaks into a
//! concurrent query, and a restore never clobbers another override.

use parking_lot::RwLock;
use std::future::Future;
use tokio::sync::{RwLock as AsyncRwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::task::ReasoningMode;

pub struct SessionReasoning {
    mode: RwLock<ReasoningMode>,
    gate: AsyncRwLock<()>,
}

impl SessionReasoning {
    pub fn new(initial: ReasoningMode) -> Self {
        Self {
            mode: RwLock::new(initial),
            gate: AsyncRwLock::new(()),
        }
    }

    /// The ambient mode as of now.
    pub fn current(&self) -> ReasoningMode {
        self.mode.read().clone()
    }

    /// Change the ambient mode once no scoped override is active.
    pub async fn set(&self, mode: ReasoningMode) {
        let _exclusive = self.gate.write().await;
        debug!(reasoning = %mode, "Ambient reasoning mode changed");
        *self.mode.write() = mode;
    }

    /// Apply `mode` until the returned scope is dropped.
    pub async fn enter(&self, mode: ReasoningMode) -> ReasoningScope<'_> {
        let exclusive = self.gate.write().await;
        let previous = std::mem::replace(&mut *self.mode.write(), mode.clone());
        debug!(reasoning = %mode, previous = %previous, "Reasoning override applied");
        ReasoningScope {
            session: self,
            previous: Some(previous),
            _exclusive: exclusive,
        }
    }

    /// Hold the gate shared: the ambient mode cannot change until dropped.
    pub async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }

    /// Run `dispatch` under `override_mode` if given, otherwise under the
    /// ambient mode.
    pub async fn run_scoped<F, T>(&self, override_mode: Option<ReasoningMode>, dispatch: F) -> T
    where
        F: Future<Output = T>,
    {
        match override_mode {
            Some(mode) => {
                let _scope = self.enter(mode).await;
                dispatch.await
            }
            None => {
                let _shared = self.shared().await;
                dispatch.await
            }
        }
    }
}

impl Default for SessionReasoning {
    fn default() -> Self {
        Self::new(ReasoningMode::default())
    }
}

/// Restores the snapshotted ambient mode on drop, then releases the gate.
pub struct ReasoningScope<'a> {
    session: &'a SessionReasoning,
    previous: Option<ReasoningMode>,
    _exclusive: RwLockWriteGuard<'a, ()>,
}

impl ReasoningScope<'_> {
    /// Mode that will be restored.
    pub fn previous(&self) -> Option<&ReasoningMode> {
        self.previous.as_ref()
    }
}

impl Drop for ReasoningScope<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            debug!(reasoning = %previous, "Reasoning override restored");
            *self.session.mode.write() = previous;
        }
    }
}
