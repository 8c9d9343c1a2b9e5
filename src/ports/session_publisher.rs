//! SessionPublisher port - fan-out of committed session changes.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::session::SessionUpdate;

/// Port for publishing session updates to real-time subscribers.
///
/// Delivery is best effort with no replay: subscribers only see updates
/// published after they subscribed.
#[async_trait]
pub trait SessionPublisher: Send + Sync {
    /// Publish one update on the session's topic.
    ///
    /// Having no subscribers is not an error.
    async fn publish(&self, update: SessionUpdate) -> Result<(), DomainError>;

    /// Drop any per-topic resources held for a session.
    async fn retire(&self, session_id: SessionId);
}
