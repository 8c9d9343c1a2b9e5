//! Live handle - the in-memory copy of one open session.

use tokio::sync::{Mutex, MutexGuard};

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::session::Session;
use crate::ports::SessionStore;

/// State guarded by a handle's mutex.
#[derive(Debug)]
pub struct LiveState {
    pub(crate) session: Session,
    /// Committed changes not yet written to the store.
    pub(crate) dirty: bool,
    /// Set when the session closed; the handle must no longer be used.
    pub(crate) retired: bool,
}

impl LiveState {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

/// Owns the authoritative copy of an open session.
///
/// Every read and commit of the session runs under the handle's mutex, so
/// commits and publishes for one session are totally ordered.
#[derive(Debug)]
pub struct LiveHandle {
    session_id: SessionId,
    state: Mutex<LiveState>,
}

impl LiveHandle {
    /// Wraps a session that is already durably Open.
    pub fn new(session: Session) -> Self {
        Self {
            session_id: session.id(),
            state: Mutex::new(LiveState {
                session,
                dirty: false,
                retired: false,
            }),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Waits for exclusive access to the live state.
    pub async fn lock(&self) -> MutexGuard<'_, LiveState> {
        self.state.lock().await
    }

    /// Copy of the held session.
    pub async fn snapshot(&self) -> Session {
        self.state.lock().await.session.clone()
    }

    /// Writes the held session to the store if it has unsaved changes.
    ///
    /// Returns whether anything was written. The handle stays dirty when
    /// the save fails.
    pub async fn checkpoint(&self, store: &dyn SessionStore) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        if state.retired || !state.dirty {
            return Ok(false);
        }
        store.save(&state.session).await?;
        state.dirty = false;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemorySessionStore;
    use crate::domain::foundation::{ErrorCode, Timestamp, UserId};
    use crate::domain::session::SessionCode;

    fn open_session() -> Session {
        let mut session = Session::new(UserId::new("a").unwrap(), "Live", None).unwrap();
        session
            .start(SessionCode::new("LIVE01").unwrap(), Timestamp::now())
            .unwrap();
        session
    }

    #[tokio::test]
    async fn clean_handle_skips_checkpoint() {
        let store = InMemorySessionStore::new();
        let handle = LiveHandle::new(open_session());
        assert!(!handle.checkpoint(&store).await.unwrap());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn dirty_handle_is_written_once() {
        let store = InMemorySessionStore::new();
        let handle = LiveHandle::new(open_session());
        {
            let mut state = handle.lock().await;
            state.session.record_join().unwrap();
            state.dirty = true;
        }
        assert!(handle.checkpoint(&store).await.unwrap());
        assert!(!handle.checkpoint(&store).await.unwrap());
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn failed_checkpoint_stays_dirty() {
        let store = InMemorySessionStore::new();
        let handle = LiveHandle::new(open_session());
        handle.lock().await.dirty = true;
        store.fail_next_save();

        let err = handle.checkpoint(&store).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StoreFailure);
        assert!(handle.lock().await.is_dirty());
    }
}
