//! Activity authoring, lifecycle and results.

use std::str::FromStr;

use crate::application::broker::Commit;
use crate::application::service::LiveSessionService;
use crate::domain::activity::{Activity, ActivityKind, ActivityResult, ChoiceEdit, NewChoice};
use crate::domain::foundation::{ActivityId, ChoiceId, DomainError, SessionId, UserId};
use crate::domain::session::Session;
use crate::ports::{Locator, Relation};

/// Command to add an activity to a session.
#[derive(Debug, Clone)]
pub struct CreateActivityCommand {
    pub actor: UserId,
    pub session_id: SessionId,
    pub name: String,
    /// `POLL`, `QUIZ` or `DND`, any case.
    pub kind: String,
}

/// Command to append choices to a draft activity.
#[derive(Debug, Clone)]
pub struct AddChoicesCommand {
    pub actor: UserId,
    pub session_id: SessionId,
    pub activity_id: ActivityId,
    pub choices: Vec<NewChoice>,
}

#[derive(Debug, Clone)]
pub struct EditChoiceCommand {
    pub actor: UserId,
    pub session_id: SessionId,
    pub activity_id: ActivityId,
    pub choice_id: ChoiceId,
    pub edit: ChoiceEdit,
}

#[derive(Debug, Clone)]
pub struct RemoveChoiceCommand {
    pub actor: UserId,
    pub session_id: SessionId,
    pub activity_id: ActivityId,
    pub choice_id: ChoiceId,
}

/// Command naming one activity, shared by start, close and reset.
#[derive(Debug, Clone)]
pub struct ActivityCommand {
    pub actor: UserId,
    pub session_id: SessionId,
    pub activity_id: ActivityId,
}

impl ActivityCommand {
    pub fn new(actor: UserId, session_id: SessionId, activity_id: ActivityId) -> Self {
        Self {
            actor,
            session_id,
            activity_id,
        }
    }
}

impl LiveSessionService {
    /// Activities of a session, visible to its author only.
    pub async fn get_activities(
        &self,
        actor: &UserId,
        session_id: SessionId,
    ) -> Result<Vec<Activity>, DomainError> {
        let session = self
            .broker
            .get_session(&Locator::Id(session_id), &[Relation::Author])
            .await?;
        session.authorize(actor)?;
        Ok(session.activities().to_vec())
    }

    /// Adds a draft activity. Written through even while the session is live.
    pub async fn create_activity(
        &self,
        cmd: CreateActivityCommand,
    ) -> Result<Commit<ActivityId>, DomainError> {
        let kind = ActivityKind::from_str(&cmd.kind)?;
        self.broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                true,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.add_activity(&cmd.name, kind)
                },
            )
            .await
    }

    pub async fn add_choices(
        &self,
        cmd: AddChoicesCommand,
    ) -> Result<Commit<Vec<ChoiceId>>, DomainError> {
        self.broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                true,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.activity_mut(cmd.activity_id)?.add_choices(cmd.choices)
                },
            )
            .await
    }

    pub async fn edit_choice(&self, cmd: EditChoiceCommand) -> Result<Session, DomainError> {
        let commit = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                true,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session
                        .activity_mut(cmd.activity_id)?
                        .edit_choice(cmd.choice_id, cmd.edit)
                },
            )
            .await?;
        Ok(commit.session)
    }

    pub async fn remove_choice(&self, cmd: RemoveChoiceCommand) -> Result<Session, DomainError> {
        let commit = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                true,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session
                        .activity_mut(cmd.activity_id)?
                        .remove_choice(cmd.choice_id)
                },
            )
            .await?;
        Ok(commit.session)
    }

    /// Opens an activity for voting. The session must be live.
    pub async fn start_activity(&self, cmd: ActivityCommand) -> Result<Session, DomainError> {
        let commit = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                false,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.open_activity(cmd.activity_id)
                },
            )
            .await?;
        tracing::info!(
            session_id = %cmd.session_id,
            activity_id = %cmd.activity_id,
            "Activity opened"
        );
        Ok(commit.session)
    }

    pub async fn close_activity(&self, cmd: ActivityCommand) -> Result<Session, DomainError> {
        let commit = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                false,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.activity_mut(cmd.activity_id)?.close()
                },
            )
            .await?;
        tracing::info!(
            session_id = %cmd.session_id,
            activity_id = %cmd.activity_id,
            "Activity closed"
        );
        Ok(commit.session)
    }

    /// Returns an archived activity to draft with zeroed counters.
    pub async fn reset_activity(&self, cmd: ActivityCommand) -> Result<Session, DomainError> {
        let commit = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                false,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.activity_mut(cmd.activity_id)?.reset()
                },
            )
            .await?;
        Ok(commit.session)
    }

    /// Tallies of an archived activity. Open to any caller.
    pub async fn get_activity_result(
        &self,
        session_id: SessionId,
        activity_id: ActivityId,
    ) -> Result<ActivityResult, DomainError> {
        let session = self
            .broker
            .get_session(&Locator::Id(session_id), &[])
            .await?;
        session.activity(activity_id)?.result()
    }
}
