//! In-memory session store.
//!
//! Holds whole aggregates in a map and enforces the same uniqueness rules
//! as the Postgres schema. Used by tests and by local runs without a
//! database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SessionId, UserId};
use crate::domain::session::{Session, SessionState};
use crate::ports::{Locator, Relation, SessionStore};

/// Map-backed `SessionStore`.
///
/// Besides the port it exposes a few test helpers: read and save
/// counters, and `fail_next_save` to inject a single store failure.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    reads: AtomicUsize,
    saves: AtomicUsize,
    fail_next_save: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Number of `find_one` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes the next `save` fail with `StoreFailure`.
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    /// Durable copy of a session, bypassing the counters.
    pub async fn snapshot(&self, id: SessionId) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    fn check_unique(
        existing: &HashMap<SessionId, Session>,
        session: &Session,
    ) -> Result<(), DomainError> {
        for other in existing.values().filter(|s| s.id() != session.id()) {
            if other.author_id() == session.author_id() && other.name() == session.name() {
                return Err(DomainError::new(
                    ErrorCode::SessionNameTaken,
                    "A session with the same name already exists",
                )
                .with_detail("name", session.name()));
            }
            if let (Some(a), Some(b)) = (other.code(), session.code()) {
                if a == b {
                    return Err(DomainError::new(
                        ErrorCode::SessionCodeTaken,
                        "Join code is already in use",
                    )
                    .with_detail("code", b.as_str()));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn find_one(
        &self,
        locator: &Locator,
        _relations: &[Relation],
    ) -> Result<Option<Session>, DomainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let sessions = self.sessions.read().await;
        let found = match locator {
            Locator::Id(id) => sessions.get(id),
            Locator::Code(code) => sessions.values().find(|s| s.code() == Some(code)),
        };
        Ok(found.cloned())
    }

    async fn find_open(&self) -> Result<Vec<Session>, DomainError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.state() == SessionState::Open)
            .cloned()
            .collect())
    }

    async fn find_by_author(&self, author: &UserId) -> Result<Vec<Session>, DomainError> {
        let sessions = self.sessions.read().await;
        let mut owned: Vec<Session> = sessions
            .values()
            .filter(|s| s.author_id() == author)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at().cmp(a.updated_at()));
        Ok(owned)
    }

    async fn save(&self, session: &Session) -> Result<(), DomainError> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(DomainError::store("injected save failure"));
        }
        let mut sessions = self.sessions.write().await;
        Self::check_unique(&sessions, session)?;

        let mut stored = session.clone();
        stored.set_num_joined(0);
        sessions.insert(stored.id(), stored);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<(), DomainError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(DomainError::new(ErrorCode::SessionNotFound, "Session does not exist")
                .with_detail("session_id", id.to_string())),
        }
    }
}
