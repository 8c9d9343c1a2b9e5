//! In-process topic broker for live session updates.
//!
//! Topics are organized by session, one broadcast channel per session:
//!
//! ```text
//! SESSION_<a>          SESSION_<b>
//! ├── subscriber 1     ├── subscriber 4
//! ├── subscriber 2     └── subscriber 5
//! └── subscriber 3
//! ```
//!
//! A committed change to session `a` reaches only subscribers 1-3.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::session::{topic_for, SessionUpdate};
use crate::ports::SessionPublisher;

/// Default buffer size of each topic's channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Manages per-session broadcast topics.
///
/// Uses `RwLock` for the topic table since publishes (reads) vastly
/// outnumber subscribe/retire (writes).
pub struct TopicBroker {
    topics: RwLock<HashMap<SessionId, broadcast::Sender<SessionUpdate>>>,
    channel_capacity: usize,
}

impl TopicBroker {
    /// Create a broker whose topics buffer `channel_capacity` updates.
    ///
    /// Subscribers that fall further behind than the buffer skip ahead and
    /// miss the overwritten updates.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Create with default capacity (128 updates).
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Subscribe to a session's topic, creating it if needed.
    ///
    /// Only updates published after this call are delivered.
    pub async fn subscribe(&self, session_id: SessionId) -> broadcast::Receiver<SessionUpdate> {
        let mut topics = self.topics.write().await;
        let sender = topics.entry(session_id).or_insert_with(|| {
            tracing::debug!(topic = %topic_for(session_id), "Creating topic");
            let (tx, _) = broadcast::channel(self.channel_capacity);
            tx
        });
        sender.subscribe()
    }

    /// Number of live subscribers on a session's topic.
    pub async fn subscriber_count(&self, session_id: SessionId) -> usize {
        self.topics
            .read()
            .await
            .get(&session_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Sessions that currently have a topic.
    pub async fn active_topics(&self) -> Vec<SessionId> {
        self.topics.read().await.keys().copied().collect()
    }
}

impl Default for TopicBroker {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl SessionPublisher for TopicBroker {
    async fn publish(&self, update: SessionUpdate) -> Result<(), DomainError> {
        let session_id = update.session().id();
        let topics = self.topics.read().await;
        if let Some(sender) = topics.get(&session_id) {
            // No receivers is fine.
            let delivered = sender.send(update).unwrap_or(0);
            tracing::trace!(topic = %topic_for(session_id), delivered, "Published session update");
        }
        Ok(())
    }

    async fn retire(&self, session_id: SessionId) {
        // Dropping the sender ends every receiver once it drains the buffer.
        if self.topics.write().await.remove(&session_id).is_some() {
            tracing::debug!(topic = %topic_for(session_id), "Retired topic");
        }
    }
}
