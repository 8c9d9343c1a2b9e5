//! Live registry - which sessions are currently served from memory.
//!
//! A handle exists for a session id exactly when the durable record of that
//! session is Open. The broker keeps this true by registering right after
//! the commit that opens a session and unregistering right after the commit
//! that archives it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::LiveHandle;
use crate::domain::foundation::{DomainError, ErrorCode, SessionId};
use crate::ports::SessionStore;

/// Outcome of writing dirty handles to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointReport {
    pub written: usize,
    pub failed: usize,
}

/// Process-wide table of live handles.
#[derive(Debug, Default)]
pub struct LiveRegistry {
    handles: RwLock<HashMap<SessionId, Arc<LiveHandle>>>,
}

impl LiveRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from every durably open session.
    pub async fn boot(store: &dyn SessionStore) -> Result<Self, DomainError> {
        let registry = Self::new();
        let open = store.find_open().await?;
        {
            let mut handles = registry.handles.write().await;
            for session in open {
                handles.insert(session.id(), Arc::new(LiveHandle::new(session)));
            }
        }
        tracing::info!(live_sessions = registry.len().await, "Live registry booted");
        Ok(registry)
    }

    /// Adds a handle.
    ///
    /// # Errors
    ///
    /// - `SessionAlreadyLive` if the session already has a handle
    pub async fn register(&self, handle: Arc<LiveHandle>) -> Result<(), DomainError> {
        let session_id = handle.session_id();
        let mut handles = self.handles.write().await;
        if handles.contains_key(&session_id) {
            return Err(DomainError::new(
                ErrorCode::SessionAlreadyLive,
                "Session is already live",
            )
            .with_detail("session_id", session_id.to_string()));
        }
        handles.insert(session_id, handle);
        Ok(())
    }

    pub async fn lookup(&self, session_id: SessionId) -> Option<Arc<LiveHandle>> {
        self.handles.read().await.get(&session_id).cloned()
    }

    pub async fn unregister(&self, session_id: SessionId) -> Option<Arc<LiveHandle>> {
        self.handles.write().await.remove(&session_id)
    }

    pub async fn len(&self) -> usize {
        self.handles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handles.read().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<SessionId> {
        self.handles.read().await.keys().copied().collect()
    }

    async fn handles(&self) -> Vec<Arc<LiveHandle>> {
        self.handles.read().await.values().cloned().collect()
    }

    /// Writes every dirty handle to the store, continuing past failures.
    pub async fn checkpoint_all(&self, store: &dyn SessionStore) -> CheckpointReport {
        let mut report = CheckpointReport::default();
        for handle in self.handles().await {
            match handle.checkpoint(store).await {
                Ok(true) => report.written += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        session_id = %handle.session_id(),
                        error = %e,
                        "Checkpoint failed"
                    );
                }
            }
        }
        if report.written > 0 || report.failed > 0 {
            tracing::debug!(written = report.written, failed = report.failed, "Checkpoint pass");
        }
        report
    }

    /// Final checkpoint at shutdown.
    ///
    /// # Errors
    ///
    /// - `StoreFailure` if any dirty session could not be written
    pub async fn flush_all(&self, store: &dyn SessionStore) -> Result<usize, DomainError> {
        let report = self.checkpoint_all(store).await;
        tracing::info!(written = report.written, failed = report.failed, "Flushed live sessions");
        if report.failed > 0 {
            return Err(DomainError::store(format!(
                "{} live session(s) could not be flushed",
                report.failed
            )));
        }
        Ok(report.written)
    }
}
