//! Participant voting.

use crate::application::service::LiveSessionService;
use crate::domain::foundation::{ActivityId, ChoiceId, DomainError};
use crate::domain::session::Session;
use crate::ports::Locator;

/// Command to record one participant vote.
#[derive(Debug, Clone)]
pub struct CastVoteCommand {
    pub locator: Locator,
    pub activity_id: ActivityId,
    pub choice_id: ChoiceId,
    /// Position the choice was dropped at. Drag-and-drop only.
    pub position: Option<usize>,
}

impl LiveSessionService {
    /// Records a vote on an open activity.
    ///
    /// Votes are not deduplicated and are left for the checkpointer to
    /// write.
    ///
    /// # Errors
    ///
    /// - `ActivityNotFound` / `ChoiceNotFound` for unknown ids
    /// - `InvalidState` if the activity is not open
    /// - `InvalidChoice` for a kind mismatch or a missing or out of range
    ///   drag-and-drop position
    pub async fn cast_vote(&self, cmd: CastVoteCommand) -> Result<Session, DomainError> {
        let commit = self
            .broker
            .modify_session(&cmd.locator, &[], false, move |session| {
                session
                    .activity_mut(cmd.activity_id)?
                    .record_vote(cmd.choice_id, cmd.position)
            })
            .await?;
        Ok(commit.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FixedCodeGenerator, InMemorySessionStore, TopicBroker};
    use crate::application::handlers::{
        ActivityCommand, AddChoicesCommand, CreateActivityCommand, CreateSessionCommand,
        SessionCommand,
    };
    use crate::domain::activity::{ChoicePayload, NewChoice};
    use crate::domain::foundation::{ErrorCode, SessionId, UserId};
    use crate::domain::session::SessionCode;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<InMemorySessionStore>,
        svc: LiveSessionService,
        session_id: SessionId,
        activity_id: ActivityId,
        choices: Vec<ChoiceId>,
    }

    fn author() -> UserId {
        UserId::new("author").unwrap()
    }

    async fn fixture(kind: &str, open: bool) -> Fixture {
        let store = Arc::new(InMemorySessionStore::new());
        let svc = LiveSessionService::new(
            store.clone(),
            Arc::new(TopicBroker::new(16)),
            Arc::new(FixedCodeGenerator::always(SessionCode::new("VOTE01").unwrap())),
        );
        let session_id = svc
            .create_session(CreateSessionCommand {
                author: author(),
                name: "Lecture".into(),
                group: None,
            })
            .await
            .unwrap()
            .id();
        let activity_id = svc
            .create_activity(CreateActivityCommand {
                actor: author(),
                session_id,
                name: "Activity".into(),
                kind: kind.into(),
            })
            .await
            .unwrap()
            .output;
        let choices = svc
            .add_choices(AddChoicesCommand {
                actor: author(),
                session_id,
                activity_id,
                choices: vec![NewChoice::correct("A", true), NewChoice::named("B")],
            })
            .await
            .unwrap()
            .output;
        svc.start_session(SessionCommand::new(author(), session_id))
            .await
            .unwrap();
        if open {
            svc.start_activity(ActivityCommand::new(author(), session_id, activity_id))
                .await
                .unwrap();
        }
        Fixture {
            store,
            svc,
            session_id,
            activity_id,
            choices,
        }
    }

    fn vote(fx: &Fixture, choice: usize, position: Option<usize>) -> CastVoteCommand {
        CastVoteCommand {
            locator: Locator::Id(fx.session_id),
            activity_id: fx.activity_id,
            choice_id: fx.choices[choice],
            position,
        }
    }

    #[tokio::test]
    async fn poll_vote_increments_and_stays_in_memory() {
        let fx = fixture("POLL", true).await;
        let saves = fx.store.save_count();

        let session = fx.svc.cast_vote(vote(&fx, 0, None)).await.unwrap();
        let choice = &session.activity(fx.activity_id).unwrap().choices()[0];
        assert_eq!(choice.payload(), &ChoicePayload::Poll { votes: 1 });
        assert_eq!(fx.store.save_count(), saves);
    }

    #[tokio::test]
    async fn vote_on_draft_activity_is_invalid_state() {
        let fx = fixture("POLL", false).await;
        let err = fx.svc.cast_vote(vote(&fx, 0, None)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);

        let session = fx
            .svc
            .session_details(&Locator::Id(fx.session_id))
            .await
            .unwrap();
        let total: u64 = session
            .activity(fx.activity_id)
            .unwrap()
            .choices()
            .iter()
            .map(|c| c.payload().total_votes())
            .sum();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn vote_by_code_reaches_live_session() {
        let fx = fixture("QUIZ", true).await;
        let cmd = CastVoteCommand {
            locator: Locator::Code(SessionCode::new("vote01").unwrap()),
            ..vote(&fx, 1, None)
        };
        let session = fx.svc.cast_vote(cmd).await.unwrap();
        let choice = &session.activity(fx.activity_id).unwrap().choices()[1];
        assert_eq!(
            choice.payload(),
            &ChoicePayload::Quiz {
                votes: 1,
                is_correct: false
            }
        );
    }

    #[tokio::test]
    async fn drag_and_drop_vote_hits_one_slot() {
        let fx = fixture("DND", true).await;
        let session = fx.svc.cast_vote(vote(&fx, 1, Some(0))).await.unwrap();
        let activity = session.activity(fx.activity_id).unwrap();
        assert_eq!(
            activity.choices()[1].payload(),
            &ChoicePayload::DragAndDrop {
                correct_position: Some(1),
                votes: vec![1, 0]
            }
        );
        assert_eq!(
            activity.choices()[0].payload(),
            &ChoicePayload::DragAndDrop {
                correct_position: Some(0),
                votes: vec![0, 0]
            }
        );
    }

    #[tokio::test]
    async fn drag_and_drop_without_position_is_invalid_choice() {
        let fx = fixture("DND", true).await;
        let err = fx.svc.cast_vote(vote(&fx, 0, None)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidChoice);
        let err = fx.svc.cast_vote(vote(&fx, 0, Some(2))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidChoice);
    }

    #[tokio::test]
    async fn unknown_choice_is_not_found() {
        let fx = fixture("POLL", true).await;
        let cmd = CastVoteCommand {
            choice_id: ChoiceId::new(),
            ..vote(&fx, 0, None)
        };
        let err = fx.svc.cast_vote(cmd).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ChoiceNotFound);
    }

    #[tokio::test]
    async fn unknown_activity_is_not_found() {
        let fx = fixture("POLL", true).await;
        let cmd = CastVoteCommand {
            activity_id: ActivityId::new(),
            ..vote(&fx, 0, None)
        };
        let err = fx.svc.cast_vote(cmd).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ActivityNotFound);
    }
}
