//! LiveSessionService - the operations exposed to the outer surfaces.
//!
//! Every mutation goes through the [`SessionBroker`]; the command handlers
//! in `handlers` only decide which guards a transform runs, which
//! relations must be read fresh, and whether a live commit is written
//! through immediately.

use std::sync::Arc;

use super::broker::SessionBroker;
use super::live::{Checkpointer, CheckpointerConfig, LiveRegistry};
use super::subscription::SessionSubscription;
use crate::adapters::TopicBroker;
use crate::domain::foundation::{DomainError, SessionId};
use crate::ports::{CodeGenerator, Locator, SessionStore};

/// Facade over the broker, the live registry and the topic broker.
pub struct LiveSessionService {
    pub(crate) broker: SessionBroker,
    pub(crate) topics: Arc<TopicBroker>,
    pub(crate) codes: Arc<dyn CodeGenerator>,
}

impl LiveSessionService {
    /// Service with an empty registry. Use [`LiveSessionService::boot`]
    /// when the store may already hold open sessions.
    pub fn new(
        store: Arc<dyn SessionStore>,
        topics: Arc<TopicBroker>,
        codes: Arc<dyn CodeGenerator>,
    ) -> Self {
        Self::with_registry(store, Arc::new(LiveRegistry::new()), topics, codes)
    }

    /// Service whose registry holds a handle for every open session in the store.
    pub async fn boot(
        store: Arc<dyn SessionStore>,
        topics: Arc<TopicBroker>,
        codes: Arc<dyn CodeGenerator>,
    ) -> Result<Self, DomainError> {
        let registry = Arc::new(LiveRegistry::boot(store.as_ref()).await?);
        Ok(Self::with_registry(store, registry, topics, codes))
    }

    fn with_registry(
        store: Arc<dyn SessionStore>,
        registry: Arc<LiveRegistry>,
        topics: Arc<TopicBroker>,
        codes: Arc<dyn CodeGenerator>,
    ) -> Self {
        let broker = SessionBroker::new(store, registry, topics.clone());
        Self {
            broker,
            topics,
            codes,
        }
    }

    pub fn broker(&self) -> &SessionBroker {
        &self.broker
    }

    pub fn registry(&self) -> &Arc<LiveRegistry> {
        self.broker.registry()
    }

    pub fn topics(&self) -> &Arc<TopicBroker> {
        &self.topics
    }

    /// Periodic checkpointer over this service's registry and store.
    pub fn checkpointer(&self, config: CheckpointerConfig) -> Checkpointer {
        Checkpointer::with_config(
            self.registry().clone(),
            self.broker.store().clone(),
            config,
        )
    }

    /// Subscribes to a live session's updates.
    ///
    /// The returned subscription carries a snapshot taken under the
    /// handle lock, so no commit falls between the snapshot and the first
    /// update received.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session does not exist
    /// - `InvalidState` if the session is not open
    pub async fn subscribe(&self, session_id: SessionId) -> Result<SessionSubscription, DomainError> {
        let handle = match self.registry().lookup(session_id).await {
            Some(handle) => handle,
            None => {
                let session = self
                    .broker
                    .get_session(&Locator::Id(session_id), &[])
                    .await?;
                // Resolution ran under the gate; an open session now has a handle.
                match self.registry().lookup(session_id).await {
                    Some(handle) if session.is_live() => handle,
                    _ => return Err(not_live(session_id)),
                }
            }
        };

        let state = handle.lock().await;
        if state.is_retired() {
            return Err(not_live(session_id));
        }
        let receiver = self.topics.subscribe(session_id).await;
        let snapshot = state.session().clone();
        drop(state);

        tracing::debug!(session_id = %session_id, "Subscriber attached");
        Ok(SessionSubscription::new(snapshot, receiver))
    }

    /// Writes every live session to the store. Called once on shutdown.
    pub async fn shutdown(&self) -> Result<usize, DomainError> {
        self.registry()
            .flush_all(self.broker.store().as_ref())
            .await
    }
}

fn not_live(session_id: SessionId) -> DomainError {
    DomainError::invalid_state("Session is not live")
        .with_detail("session_id", session_id.to_string())
}

/// Trims a group label; blank labels mean no group.
pub(crate) fn normalize_group(group: Option<String>) -> Option<String> {
    group
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
}
