//! Change notifications published to session subscribers.

use serde::Serialize;

use super::Session;
use crate::domain::foundation::SessionId;

/// A committed change to a live session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "session", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// The session changed and is still open.
    Updated(Session),
    /// Final snapshot; no further updates follow on this topic.
    Closed(Session),
}

impl SessionUpdate {
    pub fn session(&self) -> &Session {
        match self {
            SessionUpdate::Updated(session) | SessionUpdate::Closed(session) => session,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionUpdate::Closed(_))
    }

    /// Topic the update is published on.
    pub fn topic(&self) -> String {
        topic_for(self.session().id())
    }
}

/// Per-session topic name, `SESSION_<id>`.
pub fn topic_for(session_id: SessionId) -> String {
    format!("SESSION_{}", session_id)
}
