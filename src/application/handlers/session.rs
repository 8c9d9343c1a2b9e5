//! Session lifecycle commands and queries.

use crate::application::broker::Commit;
use crate::application::service::{normalize_group, LiveSessionService};
use crate::domain::foundation::{DomainError, ErrorCode, SessionId, Timestamp, UserId};
use crate::domain::session::{Session, SessionState};
use crate::ports::{Locator, Relation};

/// Command to create a draft session.
#[derive(Debug, Clone)]
pub struct CreateSessionCommand {
    pub author: UserId,
    pub name: String,
    pub group: Option<String>,
}

/// Command to rename or regroup a draft session.
///
/// `group: Some(None)` clears the group.
#[derive(Debug, Clone)]
pub struct EditSessionCommand {
    pub actor: UserId,
    pub session_id: SessionId,
    pub name: Option<String>,
    pub group: Option<Option<String>>,
}

/// Command to copy a session into a new draft.
#[derive(Debug, Clone)]
pub struct DuplicateSessionCommand {
    pub actor: UserId,
    pub session_id: SessionId,
    pub new_name: String,
}

/// Command carrying only the acting author and the session, shared by
/// start, close and delete.
#[derive(Debug, Clone)]
pub struct SessionCommand {
    pub actor: UserId,
    pub session_id: SessionId,
}

impl SessionCommand {
    pub fn new(actor: UserId, session_id: SessionId) -> Self {
        Self { actor, session_id }
    }
}

/// Result of closing a session.
#[derive(Debug, Clone)]
pub struct CloseSessionResult {
    pub session: Session,
    /// Activities archived because they were still open.
    pub archived_activities: usize,
}

/// Result of joining a session.
#[derive(Debug, Clone)]
pub struct JoinSessionResult {
    pub session: Session,
    pub num_joined: u32,
}

impl LiveSessionService {
    /// Creates a draft session. Names are unique per author.
    pub async fn create_session(&self, cmd: CreateSessionCommand) -> Result<Session, DomainError> {
        let session = Session::new(cmd.author, &cmd.name, normalize_group(cmd.group))?;
        self.broker.store().save(&session).await?;
        tracing::info!(session_id = %session.id(), name = session.name(), "Session created");
        Ok(session)
    }

    pub async fn edit_session(&self, cmd: EditSessionCommand) -> Result<Session, DomainError> {
        let group = cmd.group.map(normalize_group);
        let commit = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                true,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.edit(cmd.name.as_deref(), group)
                },
            )
            .await?;
        Ok(commit.session)
    }

    /// Deletes a draft or archived session.
    pub async fn delete_session(&self, cmd: SessionCommand) -> Result<(), DomainError> {
        self.broker
            .remove_session(&Locator::Id(cmd.session_id), &[Relation::Author], |session| {
                session.authorize(&cmd.actor)?;
                session.ensure_deletable()
            })
            .await?;
        Ok(())
    }

    /// Copies a non-live session into a new draft owned by the same author.
    pub async fn duplicate_session(
        &self,
        cmd: DuplicateSessionCommand,
    ) -> Result<Session, DomainError> {
        let source = self
            .broker
            .get_session(&Locator::Id(cmd.session_id), &[Relation::Author])
            .await?;
        source.authorize(&cmd.actor)?;
        let copy = source.duplicate(&cmd.new_name)?;
        self.broker.store().save(&copy).await?;
        tracing::info!(
            session_id = %copy.id(),
            source_id = %source.id(),
            "Session duplicated"
        );
        Ok(copy)
    }

    /// Opens a draft session under a freshly drawn join code.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the actor is not the author
    /// - `InvalidState` if the session is not a draft
    /// - `SessionCodeTaken` if the drawn code is already held by another
    ///   session; the session stays a draft
    pub async fn start_session(&self, cmd: SessionCommand) -> Result<Session, DomainError> {
        let code = self.codes.generate();
        let taken = self
            .broker
            .store()
            .find_one(&Locator::Code(code.clone()), &[])
            .await?
            .is_some();

        let commit = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                true,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.ensure_state(SessionState::Draft)?;
                    if taken {
                        return Err(DomainError::new(
                            ErrorCode::SessionCodeTaken,
                            "Generated join code is already in use",
                        )
                        .with_detail("code", code.as_str()));
                    }
                    session.start(code, Timestamp::now())
                },
            )
            .await?;
        Ok(commit.session)
    }

    /// Archives an open session and every activity still open in it.
    pub async fn close_session(&self, cmd: SessionCommand) -> Result<CloseSessionResult, DomainError> {
        let Commit { session, output } = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                true,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.ensure_state(SessionState::Open)?;
                    session.close(Timestamp::now())
                },
            )
            .await?;
        Ok(CloseSessionResult {
            session,
            archived_activities: output,
        })
    }

    /// Public snapshot of a session by id or join code.
    pub async fn session_details(&self, locator: &Locator) -> Result<Session, DomainError> {
        self.broker.get_session(locator, &[]).await
    }

    /// Counts a participant joining an open session by its code.
    pub async fn join_session(&self, locator: &Locator) -> Result<JoinSessionResult, DomainError> {
        let Commit { session, output } = self
            .broker
            .modify_session(locator, &[], false, |session| session.record_join())
            .await?;
        Ok(JoinSessionResult {
            session,
            num_joined: output,
        })
    }
}
