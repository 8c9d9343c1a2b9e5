//! Session broker - the single entry point for reading and mutating sessions.
//!
//! Callers never touch the store or a live handle directly. They hand the
//! broker a locator and a synchronous transform; the broker decides whether
//! the session is served from memory (open) or from the store (draft or
//! archived), runs the transform on a private copy, commits, and notifies.
//!
//! ```text
//!              ┌─ live handle (Open) ── commit to memory ─┬─ publish Updated
//! locator ─────┤                                          └─ close: save, evict, publish Closed
//!              └─ store (Draft/Archived) ── save ─── start: register handle, publish Updated
//! ```
//!
//! # Consistency
//!
//! A handle exists exactly when the durable record is Open. Durable-path
//! work runs under the per-session gate and re-checks the registry after
//! taking it, so a reader never acts on "durable Open, no handle".

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;

use super::live::{LiveHandle, LiveRegistry, SessionGates};
use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp};
use crate::domain::session::{Session, SessionState, SessionUpdate};
use crate::ports::{Locator, Relation, SessionPublisher, SessionStore};

/// Result of a committed mutation.
#[derive(Debug, Clone)]
pub struct Commit<T> {
    /// The session as committed.
    pub session: Session,
    /// Whatever the transform returned.
    pub output: T,
}

enum Resolved {
    Live(Arc<LiveHandle>),
    Durable {
        session: Session,
        _gate: OwnedMutexGuard<()>,
    },
}

/// Reconciles the durable and live representations of sessions.
pub struct SessionBroker {
    store: Arc<dyn SessionStore>,
    registry: Arc<LiveRegistry>,
    publisher: Arc<dyn SessionPublisher>,
    gates: SessionGates,
}

impl SessionBroker {
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<LiveRegistry>,
        publisher: Arc<dyn SessionPublisher>,
    ) -> Self {
        Self {
            store,
            registry,
            publisher,
            gates: SessionGates::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<LiveRegistry> {
        &self.registry
    }

    /// Current state of a session. Never persists, never notifies.
    pub async fn get_session(
        &self,
        locator: &Locator,
        relations: &[Relation],
    ) -> Result<Session, DomainError> {
        for _ in 0..2 {
            match self.resolve(locator, relations).await? {
                Resolved::Live(handle) => {
                    let state = handle.lock().await;
                    if state.is_retired() {
                        continue;
                    }
                    return Ok(state.session().clone());
                }
                Resolved::Durable { session, .. } => return Ok(session),
            }
        }
        Err(retired_twice(locator))
    }

    /// Applies `transform` to the session and commits the result.
    ///
    /// The transform runs on a copy; if it fails nothing is committed.
    /// Live sessions are written to the store only when
    /// `persist_immediately` is set or the transform archived the session;
    /// other live commits are left for the checkpointer.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the locator matches nothing
    /// - whatever the transform returns
    /// - `StoreFailure` if a required save fails; nothing is committed
    /// - `Internal` if the store says Open but no handle is registered
    pub async fn modify_session<T, F>(
        &self,
        locator: &Locator,
        relations: &[Relation],
        persist_immediately: bool,
        transform: F,
    ) -> Result<Commit<T>, DomainError>
    where
        F: FnOnce(&mut Session) -> Result<T, DomainError> + Send,
        T: Send,
    {
        let mut transform = Some(transform);

        for _ in 0..2 {
            match self.resolve(locator, relations).await? {
                Resolved::Live(handle) => {
                    let mut state = handle.lock().await;
                    if state.is_retired() {
                        // Closed while we waited; the store now has the final record.
                        continue;
                    }
                    let transform = take(&mut transform)?;

                    let mut draft = state.session().clone();
                    let output = transform(&mut draft)?;
                    draft.touch(Timestamp::now());

                    let closing = draft.state() == SessionState::Archived;
                    if persist_immediately || closing {
                        self.store.save(&draft).await?;
                        state.dirty = false;
                    } else {
                        state.dirty = true;
                    }
                    state.session = draft.clone();

                    if closing {
                        self.registry.unregister(draft.id()).await;
                        state.retired = true;
                        tracing::info!(
                            session_id = %draft.id(),
                            code = ?draft.code().map(|c| c.as_str()),
                            "Session closed and evicted"
                        );
                        self.notify(SessionUpdate::Closed(draft.clone())).await;
                        self.publisher.retire(draft.id()).await;
                    } else {
                        tracing::debug!(
                            session_id = %draft.id(),
                            persisted = persist_immediately,
                            "Committed live mutation"
                        );
                        self.notify(SessionUpdate::Updated(draft.clone())).await;
                    }
                    return Ok(Commit {
                        session: draft,
                        output,
                    });
                }
                Resolved::Durable { mut session, _gate } => {
                    let transform = take(&mut transform)?;
                    let before = session.state();
                    let output = transform(&mut session)?;
                    session.touch(Timestamp::now());
                    self.store.save(&session).await?;

                    if before == SessionState::Draft && session.state() == SessionState::Open {
                        self.registry
                            .register(Arc::new(LiveHandle::new(session.clone())))
                            .await?;
                        tracing::info!(
                            session_id = %session.id(),
                            code = ?session.code().map(|c| c.as_str()),
                            state = %session.state(),
                            "Session opened and registered"
                        );
                        self.notify(SessionUpdate::Updated(session.clone())).await;
                    } else {
                        tracing::debug!(session_id = %session.id(), "Committed durable mutation");
                    }
                    return Ok(Commit { session, output });
                }
            }
        }
        Err(retired_twice(locator))
    }

    /// Deletes a session that `check` accepts.
    ///
    /// Live sessions are never deleted; `check` sees them so it can reject
    /// with its own error.
    pub async fn remove_session<F>(
        &self,
        locator: &Locator,
        relations: &[Relation],
        check: F,
    ) -> Result<Session, DomainError>
    where
        F: FnOnce(&Session) -> Result<(), DomainError> + Send,
    {
        match self.resolve(locator, relations).await? {
            Resolved::Live(handle) => {
                let session = handle.snapshot().await;
                check(&session)?;
                Err(DomainError::invalid_state("Close the session before deleting it"))
            }
            Resolved::Durable { session, _gate } => {
                check(&session)?;
                self.store.delete(session.id()).await?;
                tracing::info!(session_id = %session.id(), "Session deleted");
                Ok(session)
            }
        }
    }

    async fn resolve(
        &self,
        locator: &Locator,
        relations: &[Relation],
    ) -> Result<Resolved, DomainError> {
        let session_id = match locator {
            Locator::Id(id) => {
                if relations.is_empty() {
                    if let Some(handle) = self.registry.lookup(*id).await {
                        return Ok(Resolved::Live(handle));
                    }
                }
                *id
            }
            Locator::Code(_) => self
                .store
                .find_one(locator, relations)
                .await?
                .ok_or_else(|| not_found(locator))?
                .id(),
        };

        let gate = self.gates.acquire(session_id).await;
        if let Some(handle) = self.registry.lookup(session_id).await {
            return Ok(Resolved::Live(handle));
        }

        let session = self
            .store
            .find_one(&Locator::Id(session_id), relations)
            .await?
            .ok_or_else(|| not_found(locator))?;
        if session.is_live() {
            tracing::error!(session_id = %session_id, "Durable record is open but no live handle exists");
            return Err(DomainError::internal("Open session has no live handle")
                .with_detail("session_id", session_id.to_string()));
        }
        Ok(Resolved::Durable {
            session,
            _gate: gate,
        })
    }

    async fn notify(&self, update: SessionUpdate) {
        let session_id = update.session().id();
        if let Err(e) = self.publisher.publish(update).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to publish session update");
        }
    }
}

fn take<F>(transform: &mut Option<F>) -> Result<F, DomainError> {
    transform
        .take()
        .ok_or_else(|| DomainError::internal("Transform already consumed"))
}

fn not_found(locator: &Locator) -> DomainError {
    DomainError::new(ErrorCode::SessionNotFound, "Session does not exist")
        .with_detail("locator", locator.to_string())
}

fn retired_twice(locator: &Locator) -> DomainError {
    DomainError::internal("Session handle retired during resolution")
        .with_detail("locator", locator.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySessionStore, TopicBroker};
    use crate::domain::activity::{ActivityKind, NewChoice};
    use crate::domain::foundation::UserId;
    use crate::domain::session::SessionCode;

    struct Fixture {
        store: Arc<InMemorySessionStore>,
        topics: Arc<TopicBroker>,
        broker: SessionBroker,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemorySessionStore::new());
        let topics = Arc::new(TopicBroker::new(16));
        let broker = SessionBroker::new(store.clone(), Arc::new(LiveRegistry::new()), topics.clone());
        Fixture {
            store,
            topics,
            broker,
        }
    }

    fn author() -> UserId {
        UserId::new("author").unwrap()
    }

    async fn draft(fx: &Fixture) -> Session {
        let session = Session::new(author(), "Lecture", None).unwrap();
        fx.store.save(&session).await.unwrap();
        session
    }

    async fn start(fx: &Fixture, id: SessionId, code: &str) -> Session {
        let code = SessionCode::new(code).unwrap();
        fx.broker
            .modify_session(&Locator::Id(id), &[], false, |s| s.start(code, Timestamp::now()))
            .await
            .unwrap()
            .session
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let fx = fixture();
        let err = fx
            .broker
            .get_session(&Locator::Id(SessionId::new()), &[])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }

    #[tokio::test]
    async fn starting_registers_a_handle() {
        let fx = fixture();
        let session = draft(&fx).await;
        let opened = start(&fx, session.id(), "OPEN01").await;

        assert_eq!(opened.state(), SessionState::Open);
        assert!(fx.broker.registry().lookup(session.id()).await.is_some());
        let durable = fx.store.snapshot(session.id()).await.unwrap();
        assert_eq!(durable.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn live_reads_skip_the_store() {
        let fx = fixture();
        let session = draft(&fx).await;
        start(&fx, session.id(), "FAST01").await;

        let reads = fx.store.read_count();
        let live = fx
            .broker
            .get_session(&Locator::Id(session.id()), &[])
            .await
            .unwrap();
        assert_eq!(live.state(), SessionState::Open);
        assert_eq!(fx.store.read_count(), reads);
    }

    #[tokio::test]
    async fn failed_transform_commits_nothing() {
        let fx = fixture();
        let session = draft(&fx).await;
        start(&fx, session.id(), "FAIL01").await;
        let saves = fx.store.save_count();

        let err = fx
            .broker
            .modify_session(&Locator::Id(session.id()), &[], true, |s| {
                s.add_activity("Poll", ActivityKind::Poll)?;
                Err::<(), _>(DomainError::invalid_state("nope"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);

        let live = fx
            .broker
            .get_session(&Locator::Id(session.id()), &[])
            .await
            .unwrap();
        assert!(live.activities().is_empty());
        assert_eq!(fx.store.save_count(), saves);
    }

    #[tokio::test]
    async fn live_commit_without_persist_marks_dirty() {
        let fx = fixture();
        let session = draft(&fx).await;
        start(&fx, session.id(), "DIRTY1").await;
        let saves = fx.store.save_count();

        fx.broker
            .modify_session(&Locator::Id(session.id()), &[], false, |s| s.record_join())
            .await
            .unwrap();

        assert_eq!(fx.store.save_count(), saves);
        let handle = fx.broker.registry().lookup(session.id()).await.unwrap();
        assert!(handle.lock().await.is_dirty());
    }

    #[tokio::test]
    async fn failed_persist_leaves_live_copy_untouched() {
        let fx = fixture();
        let session = draft(&fx).await;
        start(&fx, session.id(), "PERS01").await;

        fx.store.fail_next_save();
        let err = fx
            .broker
            .modify_session(&Locator::Id(session.id()), &[], true, |s| {
                s.add_activity("Poll", ActivityKind::Poll)
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StoreFailure);

        let live = fx
            .broker
            .get_session(&Locator::Id(session.id()), &[])
            .await
            .unwrap();
        assert!(live.activities().is_empty());
    }

    #[tokio::test]
    async fn close_evicts_and_publishes_closed() {
        let fx = fixture();
        let session = draft(&fx).await;
        start(&fx, session.id(), "CLOSE1").await;
        let mut rx = fx.topics.subscribe(session.id()).await;

        fx.broker
            .modify_session(&Locator::Id(session.id()), &[], false, |s| {
                s.close(Timestamp::now())
            })
            .await
            .unwrap();

        assert!(fx.broker.registry().lookup(session.id()).await.is_none());
        assert!(rx.recv().await.unwrap().is_closed());
        let durable = fx.store.snapshot(session.id()).await.unwrap();
        assert_eq!(durable.state(), SessionState::Archived);

        let after = fx
            .broker
            .get_session(&Locator::Id(session.id()), &[])
            .await
            .unwrap();
        assert_eq!(after.state(), SessionState::Archived);
    }

    #[tokio::test]
    async fn failed_close_save_keeps_session_live() {
        let fx = fixture();
        let session = draft(&fx).await;
        start(&fx, session.id(), "CLOSE2").await;

        fx.store.fail_next_save();
        let err = fx
            .broker
            .modify_session(&Locator::Id(session.id()), &[], false, |s| {
                s.close(Timestamp::now())
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StoreFailure);
        assert!(fx.broker.registry().lookup(session.id()).await.is_some());
    }

    #[tokio::test]
    async fn code_locator_resolves_live_session() {
        let fx = fixture();
        let session = draft(&fx).await;
        start(&fx, session.id(), "BYCODE").await;

        let commit = fx
            .broker
            .modify_session(
                &Locator::Code(SessionCode::new("bycode").unwrap()),
                &[],
                false,
                |s| s.record_join(),
            )
            .await
            .unwrap();
        assert_eq!(commit.output, 1);
    }

    #[tokio::test]
    async fn open_record_without_handle_is_internal() {
        let fx = fixture();
        let mut session = Session::new(author(), "Orphan", None).unwrap();
        session
            .start(SessionCode::new("ORPHAN").unwrap(), Timestamp::now())
            .unwrap();
        fx.store.save(&session).await.unwrap();

        let err = fx
            .broker
            .get_session(&Locator::Id(session.id()), &[Relation::Author])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[tokio::test]
    async fn updates_reach_subscribers_in_commit_order() {
        let fx = fixture();
        let session = draft(&fx).await;
        start(&fx, session.id(), "ORDER1").await;
        let mut rx = fx.topics.subscribe(session.id()).await;

        let activity = fx
            .broker
            .modify_session(&Locator::Id(session.id()), &[], true, |s| {
                let id = s.add_activity("Poll", ActivityKind::Poll)?;
                s.activity_mut(id)?
                    .add_choices(vec![NewChoice::named("A")])?;
                Ok(id)
            })
            .await
            .unwrap()
            .output;
        fx.broker
            .modify_session(&Locator::Id(session.id()), &[], false, |s| {
                s.open_activity(activity)
            })
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.session().activities().len(), 1);
        assert_eq!(
            second.session().activity(activity).unwrap().state(),
            crate::domain::activity::ActivityState::Open
        );
    }

    #[tokio::test]
    async fn remove_rejects_live_sessions() {
        let fx = fixture();
        let session = draft(&fx).await;
        start(&fx, session.id(), "REMOVE").await;

        let err = fx
            .broker
            .remove_session(&Locator::Id(session.id()), &[], |s| s.ensure_deletable())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
        assert!(fx.store.snapshot(session.id()).await.is_some());
    }

    #[tokio::test]
    async fn remove_deletes_drafts() {
        let fx = fixture();
        let session = draft(&fx).await;
        fx.broker
            .remove_session(&Locator::Id(session.id()), &[], |s| s.ensure_deletable())
            .await
            .unwrap();
        assert!(fx.store.snapshot(session.id()).await.is_none());
    }
}
