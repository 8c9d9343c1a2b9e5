//! Q&A board attached to every session.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, QnaId, QuestionId, Timestamp};

/// A question submitted by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub created_at: Timestamp,
    pub text: String,
    /// Absent for anonymous submissions.
    pub author_name: Option<String>,
    pub read: bool,
}

/// The session's question board. Closed until the author opens it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qna {
    id: QnaId,
    open: bool,
    questions: Vec<Question>,
}

impl Qna {
    /// A fresh, closed board with no questions.
    pub fn new() -> Self {
        Self {
            id: QnaId::new(),
            open: false,
            questions: Vec::new(),
        }
    }

    /// Reconstitute from persistence.
    pub fn reconstitute(id: QnaId, open: bool, questions: Vec<Question>) -> Self {
        Self {
            id,
            open,
            questions,
        }
    }

    pub fn id(&self) -> QnaId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Appends a question. Blank author names count as anonymous.
    pub fn submit(
        &mut self,
        text: &str,
        author_name: Option<&str>,
        now: Timestamp,
    ) -> Result<QuestionId, DomainError> {
        if !self.open {
            return Err(DomainError::invalid_state("Q&A is not accepting questions"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("question", "Question cannot be empty"));
        }
        let author_name = author_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let id = QuestionId::new();
        self.questions.push(Question {
            id,
            created_at: now,
            text: text.to_string(),
            author_name,
            read: false,
        });
        Ok(id)
    }

    /// Sets the read flag of one question.
    pub fn mark(&mut self, question_id: QuestionId, read: bool) -> Result<(), DomainError> {
        let question = self
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::QuestionNotFound, "Question does not exist")
                    .with_detail("question_id", question_id.to_string())
            })?;
        question.read = read;
        Ok(())
    }
}

impl Default for Qna {
    fn default() -> Self {
        Self::new()
    }
}
