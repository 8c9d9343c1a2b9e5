//! PostgreSQL implementation of SessionStore.
//!
//! Sessions are stored normalized across `sessions`, `activities`,
//! `choices`, `qnas` and `questions`. A save rewrites the whole aggregate in
//! one transaction: the session and Q&A rows are upserted, child rows are
//! replaced.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::activity::{Activity, ActivityKind, ActivityState, Choice, ChoicePayload};
use crate::domain::foundation::{
    ActivityId, ChoiceId, DomainError, ErrorCode, QnaId, QuestionId, SessionId, Timestamp, UserId,
};
use crate::domain::session::{Qna, Question, Session, SessionCode, SessionState};
use crate::ports::{Locator, Relation, SessionStore};

const SESSION_COLUMNS: &str = "id, author_id, name, grp, state, code, start_time, end_time, created_at, updated_at";

/// PostgreSQL implementation of SessionStore.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Creates a new PostgresSessionStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads children for the given session rows and assembles aggregates.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Session>, DomainError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let session_ids: Vec<Uuid> = rows
            .iter()
            .map(|r| get::<Uuid>(r, "id"))
            .collect::<Result<_, _>>()?;

        let activity_rows = sqlx::query(
            r#"
            SELECT id, session_id, name, kind, state
            FROM activities
            WHERE session_id = ANY($1)
            ORDER BY session_id, position
            "#,
        )
        .bind(session_ids.clone())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch activities", e))?;

        let activity_ids: Vec<Uuid> = activity_rows
            .iter()
            .map(|r| get::<Uuid>(r, "id"))
            .collect::<Result<_, _>>()?;

        let choice_rows = sqlx::query(
            r#"
            SELECT id, activity_id, name, poll_votes, quiz_votes, quiz_is_correct,
                   dnd_correct_position, dnd_votes
            FROM choices
            WHERE activity_id = ANY($1)
            ORDER BY activity_id, position
            "#,
        )
        .bind(activity_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch choices", e))?;

        let qna_rows = sqlx::query("SELECT id, session_id, open FROM qnas WHERE session_id = ANY($1)")
            .bind(session_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to fetch qnas", e))?;

        let qna_ids: Vec<Uuid> = qna_rows
            .iter()
            .map(|r| get::<Uuid>(r, "id"))
            .collect::<Result<_, _>>()?;

        let question_rows = sqlx::query(
            r#"
            SELECT id, qna_id, created, question, author_name, read
            FROM questions
            WHERE qna_id = ANY($1)
            ORDER BY qna_id, position
            "#,
        )
        .bind(qna_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch questions", e))?;

        // Kinds are needed to decode choice payloads.
        let mut kinds: HashMap<Uuid, ActivityKind> = HashMap::new();
        for row in &activity_rows {
            kinds.insert(get(row, "id")?, parse_kind(&get::<String>(row, "kind")?)?);
        }

        let mut choices: HashMap<Uuid, Vec<Choice>> = HashMap::new();
        for row in &choice_rows {
            let activity_id: Uuid = get(row, "activity_id")?;
            let kind = kinds
                .get(&activity_id)
                .copied()
                .ok_or_else(|| DomainError::store("Choice references unknown activity"))?;
            choices
                .entry(activity_id)
                .or_default()
                .push(row_to_choice(row, kind)?);
        }

        let mut activities: HashMap<Uuid, Vec<Activity>> = HashMap::new();
        for row in &activity_rows {
            let id: Uuid = get(row, "id")?;
            let session_id: Uuid = get(row, "session_id")?;
            let state = ActivityState::parse(&get::<String>(row, "state")?)
                .ok_or_else(|| DomainError::store("Invalid activity state"))?;
            let kind = kinds
                .get(&id)
                .copied()
                .ok_or_else(|| DomainError::store("Activity kind missing"))?;
            activities
                .entry(session_id)
                .or_default()
                .push(Activity::reconstitute(
                    ActivityId::from_uuid(id),
                    get(row, "name")?,
                    kind,
                    state,
                    choices.remove(&id).unwrap_or_default(),
                ));
        }

        let mut questions: HashMap<Uuid, Vec<Question>> = HashMap::new();
        for row in &question_rows {
            let qna_id: Uuid = get(row, "qna_id")?;
            questions.entry(qna_id).or_default().push(Question {
                id: QuestionId::from_uuid(get(row, "id")?),
                created_at: Timestamp::from_datetime(get(row, "created")?),
                text: get(row, "question")?,
                author_name: get(row, "author_name")?,
                read: get(row, "read")?,
            });
        }

        let mut qnas: HashMap<Uuid, Qna> = HashMap::new();
        for row in &qna_rows {
            let id: Uuid = get(row, "id")?;
            let session_id: Uuid = get(row, "session_id")?;
            qnas.insert(
                session_id,
                Qna::reconstitute(
                    QnaId::from_uuid(id),
                    get(row, "open")?,
                    questions.remove(&id).unwrap_or_default(),
                ),
            );
        }

        rows.iter()
            .map(|row| {
                let id: Uuid = get(row, "id")?;
                row_to_session(
                    row,
                    activities.remove(&id).unwrap_or_default(),
                    qnas.remove(&id).unwrap_or_default(),
                )
            })
            .collect()
    }

    async fn write_children(
        tx: &mut Transaction<'_, Postgres>,
        session: &Session,
    ) -> Result<(), DomainError> {
        let session_id = *session.id().as_uuid();

        sqlx::query("DELETE FROM activities WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| store_error("Failed to clear activities", e))?;

        for (position, activity) in session.activities().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO activities (id, session_id, position, name, kind, state)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(activity.id().as_uuid())
            .bind(session_id)
            .bind(position as i32)
            .bind(activity.name())
            .bind(activity.kind().as_str())
            .bind(activity.state().as_str())
            .execute(&mut **tx)
            .await
            .map_err(|e| store_error("Failed to insert activity", e))?;

            for (choice_position, choice) in activity.choices().iter().enumerate() {
                let columns = ChoiceColumns::from(choice.payload());
                sqlx::query(
                    r#"
                    INSERT INTO choices (
                        id, activity_id, position, name, poll_votes, quiz_votes,
                        quiz_is_correct, dnd_correct_position, dnd_votes
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    "#,
                )
                .bind(choice.id().as_uuid())
                .bind(activity.id().as_uuid())
                .bind(choice_position as i32)
                .bind(choice.name())
                .bind(columns.poll_votes)
                .bind(columns.quiz_votes)
                .bind(columns.quiz_is_correct)
                .bind(columns.dnd_correct_position)
                .bind(columns.dnd_votes)
                .execute(&mut **tx)
                .await
                .map_err(|e| store_error("Failed to insert choice", e))?;
            }
        }

        let qna = session.qna();
        sqlx::query(
            r#"
            INSERT INTO qnas (id, session_id, open) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET open = EXCLUDED.open
            "#,
        )
        .bind(qna.id().as_uuid())
        .bind(session_id)
        .bind(qna.is_open())
        .execute(&mut **tx)
        .await
        .map_err(|e| store_error("Failed to upsert qna", e))?;

        sqlx::query("DELETE FROM questions WHERE qna_id = $1")
            .bind(qna.id().as_uuid())
            .execute(&mut **tx)
            .await
            .map_err(|e| store_error("Failed to clear questions", e))?;

        for (position, question) in qna.questions().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO questions (id, qna_id, position, created, question, author_name, read)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(question.id.as_uuid())
            .bind(qna.id().as_uuid())
            .bind(position as i32)
            .bind(question.created_at.as_datetime())
            .bind(&question.text)
            .bind(question.author_name.as_deref())
            .bind(question.read)
            .execute(&mut **tx)
            .await
            .map_err(|e| store_error("Failed to insert question", e))?;
        }

        Ok(())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn find_one(
        &self,
        locator: &Locator,
        _relations: &[Relation],
    ) -> Result<Option<Session>, DomainError> {
        // The author id lives on the session row, so `Relation::Author` needs
        // no extra join.
        let rows = match locator {
            Locator::Id(id) => {
                let sql = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);
                sqlx::query(&sql)
                    .bind(*id.as_uuid())
                    .fetch_all(&self.pool)
                    .await
            }
            Locator::Code(code) => {
                let sql = format!("SELECT {} FROM sessions WHERE code = $1", SESSION_COLUMNS);
                sqlx::query(&sql)
                    .bind(code.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| store_error("Failed to fetch session", e))?;

        Ok(self.hydrate(rows).await?.into_iter().next())
    }

    async fn find_open(&self) -> Result<Vec<Session>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM sessions WHERE state = 'open'",
            SESSION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch open sessions", e))?;

        self.hydrate(rows).await
    }

    async fn find_by_author(&self, author: &UserId) -> Result<Vec<Session>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM sessions WHERE author_id = $1 ORDER BY updated_at DESC",
            SESSION_COLUMNS
        ))
        .bind(author.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch sessions by author", e))?;

        self.hydrate(rows).await
    }

    async fn save(&self, session: &Session) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, author_id, name, grp, state, code, start_time, end_time, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                grp = EXCLUDED.grp,
                state = EXCLUDED.state,
                code = EXCLUDED.code,
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.author_id().as_str())
        .bind(session.name())
        .bind(session.group())
        .bind(session.state().as_str())
        .bind(session.code().map(|c| c.as_str().to_string()))
        .bind(session.start_time().map(|t| *t.as_datetime()))
        .bind(session.end_time().map(|t| *t.as_datetime()))
        .bind(session.created_at().as_datetime())
        .bind(session.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("Failed to upsert session", e))?;

        Self::write_children(&mut tx, session).await?;

        tx.commit()
            .await
            .map_err(|e| store_error("Failed to commit session", e))?;
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to delete session", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", id),
            ));
        }

        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

/// Nullable per-kind choice columns.
#[derive(Debug, Default, PartialEq)]
struct ChoiceColumns {
    poll_votes: Option<i64>,
    quiz_votes: Option<i64>,
    quiz_is_correct: Option<bool>,
    dnd_correct_position: Option<i32>,
    dnd_votes: Option<Vec<i64>>,
}

impl From<&ChoicePayload> for ChoiceColumns {
    fn from(payload: &ChoicePayload) -> Self {
        match payload {
            ChoicePayload::Poll { votes } => ChoiceColumns {
                poll_votes: Some(*votes as i64),
                ..Default::default()
            },
            ChoicePayload::Quiz { votes, is_correct } => ChoiceColumns {
                quiz_votes: Some(*votes as i64),
                quiz_is_correct: Some(*is_correct),
                ..Default::default()
            },
            ChoicePayload::DragAndDrop {
                correct_position,
                votes,
            } => ChoiceColumns {
                dnd_correct_position: correct_position.map(|p| p as i32),
                dnd_votes: Some(votes.iter().map(|v| *v as i64).collect()),
                ..Default::default()
            },
        }
    }
}

impl ChoiceColumns {
    fn into_payload(self, kind: ActivityKind) -> ChoicePayload {
        let count = |v: Option<i64>| v.unwrap_or(0).clamp(0, u32::MAX as i64) as u32;
        match kind {
            ActivityKind::Poll => ChoicePayload::Poll {
                votes: count(self.poll_votes),
            },
            ActivityKind::Quiz => ChoicePayload::Quiz {
                votes: count(self.quiz_votes),
                is_correct: self.quiz_is_correct.unwrap_or(false),
            },
            ActivityKind::DragAndDrop => ChoicePayload::DragAndDrop {
                correct_position: self
                    .dnd_correct_position
                    .and_then(|p| usize::try_from(p).ok()),
                votes: self
                    .dnd_votes
                    .unwrap_or_default()
                    .into_iter()
                    .map(|v| count(Some(v)))
                    .collect(),
            },
        }
    }
}

fn store_error(context: &str, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        let conflict = match db.constraint() {
            Some("sessions_code_key") => {
                Some((ErrorCode::SessionCodeTaken, "Join code is already in use"))
            }
            Some("sessions_author_name_key") => Some((
                ErrorCode::SessionNameTaken,
                "A session with the same name already exists",
            )),
            Some("activities_session_name_key") => Some((
                ErrorCode::ActivityNameTaken,
                "An activity with the same name already exists",
            )),
            _ => None,
        };
        if let Some((code, message)) = conflict {
            return DomainError::new(code, message);
        }
    }
    DomainError::store(format!("{}: {}", context, err))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<T, _>(column)
        .map_err(|e| DomainError::store(format!("Failed to get {}: {}", column, e)))
}

fn parse_kind(s: &str) -> Result<ActivityKind, DomainError> {
    s.parse::<ActivityKind>()
        .map_err(|_| DomainError::store(format!("Invalid activity kind: {}", s)))
}

fn row_to_choice(row: &PgRow, kind: ActivityKind) -> Result<Choice, DomainError> {
    let columns = ChoiceColumns {
        poll_votes: get(row, "poll_votes")?,
        quiz_votes: get(row, "quiz_votes")?,
        quiz_is_correct: get(row, "quiz_is_correct")?,
        dnd_correct_position: get(row, "dnd_correct_position")?,
        dnd_votes: get(row, "dnd_votes")?,
    };
    Ok(Choice::reconstitute(
        ChoiceId::from_uuid(get(row, "id")?),
        get(row, "name")?,
        columns.into_payload(kind),
    ))
}

fn row_to_session(
    row: &PgRow,
    activities: Vec<Activity>,
    qna: Qna,
) -> Result<Session, DomainError> {
    let state_str: String = get(row, "state")?;
    let state = SessionState::parse(&state_str)
        .ok_or_else(|| DomainError::store(format!("Invalid session state: {}", state_str)))?;

    let code = get::<Option<String>>(row, "code")?
        .map(SessionCode::new)
        .transpose()
        .map_err(|e| DomainError::store(format!("Invalid code: {}", e)))?;

    let author_id = UserId::new(get::<String>(row, "author_id")?)
        .map_err(|e| DomainError::store(format!("Invalid author_id: {}", e)))?;

    let start_time: Option<DateTime<Utc>> = get(row, "start_time")?;
    let end_time: Option<DateTime<Utc>> = get(row, "end_time")?;
    let created_at: DateTime<Utc> = get(row, "created_at")?;
    let updated_at: DateTime<Utc> = get(row, "updated_at")?;

    Ok(Session::reconstitute(
        SessionId::from_uuid(get(row, "id")?),
        author_id,
        get(row, "name")?,
        get(row, "grp")?,
        state,
        code,
        start_time.map(Timestamp::from_datetime),
        end_time.map(Timestamp::from_datetime),
        activities,
        qna,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_columns_round_trip() {
        let payload = ChoicePayload::Poll { votes: 5 };
        let columns = ChoiceColumns::from(&payload);
        assert_eq!(columns.poll_votes, Some(5));
        assert_eq!(columns.quiz_votes, None);
        assert_eq!(columns.into_payload(ActivityKind::Poll), payload);
    }

    #[test]
    fn dnd_columns_keep_position_and_votes() {
        let payload = ChoicePayload::DragAndDrop {
            correct_position: Some(2),
            votes: vec![1, 0, 3],
        };
        let columns = ChoiceColumns::from(&payload);
        assert_eq!(columns.dnd_correct_position, Some(2));
        assert_eq!(columns.dnd_votes, Some(vec![1, 0, 3]));
        assert_eq!(columns.into_payload(ActivityKind::DragAndDrop), payload);
    }

    #[test]
    fn missing_columns_decode_as_zero() {
        let payload = ChoiceColumns::default().into_payload(ActivityKind::Quiz);
        assert_eq!(
            payload,
            ChoicePayload::Quiz {
                votes: 0,
                is_correct: false
            }
        );
    }

    #[test]
    fn parse_kind_rejects_garbage() {
        assert!(parse_kind("SURVEY").is_err());
        assert_eq!(parse_kind("DND").unwrap(), ActivityKind::DragAndDrop);
    }
}
