//! Q&A board commands.

use crate::application::broker::Commit;
use crate::application::service::LiveSessionService;
use crate::domain::foundation::{DomainError, QuestionId, SessionId, Timestamp, UserId};
use crate::domain::session::Session;
use crate::ports::{Locator, Relation};

#[derive(Debug, Clone)]
pub struct ToggleQnaCommand {
    pub actor: UserId,
    pub session_id: SessionId,
    pub open: bool,
}

/// Command to post a question to a session's board.
#[derive(Debug, Clone)]
pub struct SubmitQuestionCommand {
    pub locator: Locator,
    pub text: String,
    /// Blank or missing means anonymous.
    pub author_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MarkQuestionCommand {
    pub actor: UserId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub read: bool,
}

impl LiveSessionService {
    /// Opens or closes the board of a live session.
    pub async fn toggle_qna(&self, cmd: ToggleQnaCommand) -> Result<Session, DomainError> {
        let commit = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                false,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.set_qna_open(cmd.open)
                },
            )
            .await?;
        Ok(commit.session)
    }

    /// Posts a question. Written through immediately.
    pub async fn submit_question(
        &self,
        cmd: SubmitQuestionCommand,
    ) -> Result<Commit<QuestionId>, DomainError> {
        self.broker
            .modify_session(&cmd.locator, &[], true, move |session| {
                session.submit_question(&cmd.text, cmd.author_name.as_deref(), Timestamp::now())
            })
            .await
    }

    pub async fn mark_question(&self, cmd: MarkQuestionCommand) -> Result<Session, DomainError> {
        let commit = self
            .broker
            .modify_session(
                &Locator::Id(cmd.session_id),
                &[Relation::Author],
                true,
                move |session| {
                    session.authorize(&cmd.actor)?;
                    session.mark_question(cmd.question_id, cmd.read)
                },
            )
            .await?;
        Ok(commit.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FixedCodeGenerator, InMemorySessionStore, TopicBroker};
    use crate::application::handlers::{CreateSessionCommand, SessionCommand};
    use crate::domain::foundation::ErrorCode;
    use crate::domain::session::SessionCode;
    use std::sync::Arc;

    fn author() -> UserId {
        UserId::new("author").unwrap()
    }

    async fn live_session(store: Arc<InMemorySessionStore>) -> (LiveSessionService, SessionId) {
        let svc = LiveSessionService::new(
            store,
            Arc::new(TopicBroker::new(16)),
            Arc::new(FixedCodeGenerator::always(SessionCode::new("QNA001").unwrap())),
        );
        let id = svc
            .create_session(CreateSessionCommand {
                author: author(),
                name: "Lecture".into(),
                group: None,
            })
            .await
            .unwrap()
            .id();
        svc.start_session(SessionCommand::new(author(), id))
            .await
            .unwrap();
        (svc, id)
    }

    fn question(id: SessionId, text: &str) -> SubmitQuestionCommand {
        SubmitQuestionCommand {
            locator: Locator::Id(id),
            text: text.into(),
            author_name: None,
        }
    }

    async fn open_board(svc: &LiveSessionService, id: SessionId) {
        svc.toggle_qna(ToggleQnaCommand {
            actor: author(),
            session_id: id,
            open: true,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn closed_board_rejects_questions() {
        let (svc, id) = live_session(Arc::new(InMemorySessionStore::new())).await;
        let err = svc.submit_question(question(id, "Why?")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);

        let session = svc.session_details(&Locator::Id(id)).await.unwrap();
        assert!(session.qna().questions().is_empty());
    }

    #[tokio::test]
    async fn submitted_questions_are_written_through() {
        let store = Arc::new(InMemorySessionStore::new());
        let (svc, id) = live_session(store.clone()).await;
        open_board(&svc, id).await;

        let commit = svc
            .submit_question(SubmitQuestionCommand {
                locator: Locator::Code(SessionCode::new("QNA001").unwrap()),
                text: "  What is a monad? ".into(),
                author_name: Some("  ".into()),
            })
            .await
            .unwrap();

        let durable = store.snapshot(id).await.unwrap();
        let stored = &durable.qna().questions()[0];
        assert_eq!(stored.id, commit.output);
        assert_eq!(stored.text, "What is a monad?");
        assert!(stored.author_name.is_none());
        assert!(!stored.read);
    }

    #[tokio::test]
    async fn blank_question_is_invalid_input() {
        let (svc, id) = live_session(Arc::new(InMemorySessionStore::new())).await;
        open_board(&svc, id).await;
        let err = svc.submit_question(question(id, "   ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn author_marks_questions_read() {
        let (svc, id) = live_session(Arc::new(InMemorySessionStore::new())).await;
        open_board(&svc, id).await;
        let qid = svc
            .submit_question(question(id, "Why?"))
            .await
            .unwrap()
            .output;

        let err = svc
            .mark_question(MarkQuestionCommand {
                actor: UserId::new("student").unwrap(),
                session_id: id,
                question_id: qid,
                read: true,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let session = svc
            .mark_question(MarkQuestionCommand {
                actor: author(),
                session_id: id,
                question_id: qid,
                read: true,
            })
            .await
            .unwrap();
        assert!(session.qna().questions()[0].read);
    }

    #[tokio::test]
    async fn toggle_requires_live_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let (svc, id) = live_session(store).await;
        svc.close_session(SessionCommand::new(author(), id))
            .await
            .unwrap();

        let err = svc
            .toggle_qna(ToggleQnaCommand {
                actor: author(),
                session_id: id,
                open: true,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }
}
