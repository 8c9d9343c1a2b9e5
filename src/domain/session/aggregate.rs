//! Session aggregate.
//!
//! A session is the unit of consistency for everything an instructor runs
//! in class: its activities, their choices and the Q&A board are only ever
//! changed through the session that owns them.
//!
//! # Invariants
//!
//! - `name` is trimmed and non-empty
//! - `code` is present iff `state != Draft`
//! - `start_time`/`end_time` are present iff `state != Draft`
//! - an Archived session has no Open activity
//! - an Archived session is immutable

use serde::{Deserialize, Serialize};

use super::{Qna, SessionCode, SessionState};
use crate::domain::activity::{Activity, ActivityKind};
use crate::domain::foundation::{
    ActivityId, DomainError, ErrorCode, QuestionId, SessionId, StateMachine, Timestamp, UserId,
};

/// Length of the scheduled window set when a session starts.
pub const SESSION_WINDOW_HOURS: i64 = 6;

/// Session aggregate - a live classroom session and everything inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    author_id: UserId,
    name: String,
    group: Option<String>,
    state: SessionState,
    code: Option<SessionCode>,
    start_time: Option<Timestamp>,
    end_time: Option<Timestamp>,
    activities: Vec<Activity>,
    qna: Qna,
    /// Participants joined since the session went live. Never persisted.
    #[serde(default)]
    num_joined: u32,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Session {
    /// Create a new draft session with no activities and a closed Q&A.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the trimmed name is empty
    pub fn new(author_id: UserId, name: &str, group: Option<String>) -> Result<Self, DomainError> {
        let name = Self::validate_name(name)?;
        let now = Timestamp::now();
        Ok(Self {
            id: SessionId::new(),
            author_id,
            name,
            group,
            state: SessionState::Draft,
            code: None,
            start_time: None,
            end_time: None,
            activities: Vec::new(),
            qna: Qna::new(),
            num_joined: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: SessionId,
        author_id: UserId,
        name: String,
        group: Option<String>,
        state: SessionState,
        code: Option<SessionCode>,
        start_time: Option<Timestamp>,
        end_time: Option<Timestamp>,
        activities: Vec<Activity>,
        qna: Qna,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            author_id,
            name,
            group,
            state,
            code,
            start_time,
            end_time,
            activities,
            qna,
            num_joined: 0,
            created_at,
            updated_at,
        }
    }

    fn validate_name(name: &str) -> Result<String, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name", "Session name cannot be empty"));
        }
        Ok(name.to_string())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn author_id(&self) -> &UserId {
        &self.author_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn code(&self) -> Option<&SessionCode> {
        self.code.as_ref()
    }

    pub fn start_time(&self) -> Option<&Timestamp> {
        self.start_time.as_ref()
    }

    pub fn end_time(&self) -> Option<&Timestamp> {
        self.end_time.as_ref()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn qna(&self) -> &Qna {
        &self.qna
    }

    pub fn num_joined(&self) -> u32 {
        self.num_joined
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Returns true while the session is served from a live handle.
    pub fn is_live(&self) -> bool {
        self.state == SessionState::Open
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Guards
    // ─────────────────────────────────────────────────────────────────────────

    /// Fails with `Unauthorized` unless `actor` authored this session.
    pub fn authorize(&self, actor: &UserId) -> Result<(), DomainError> {
        if &self.author_id != actor {
            return Err(DomainError::unauthorized());
        }
        Ok(())
    }

    /// Fails with `InvalidState` unless the session is in `expected`.
    pub fn ensure_state(&self, expected: SessionState) -> Result<(), DomainError> {
        if self.state != expected {
            return Err(DomainError::invalid_state(format!(
                "Session is {}, expected {}",
                self.state, expected
            ))
            .with_detail("session_id", self.id.to_string()));
        }
        Ok(())
    }

    fn ensure_not_archived(&self) -> Result<(), DomainError> {
        if self.state == SessionState::Archived {
            return Err(DomainError::invalid_state("Archived sessions cannot be modified")
                .with_detail("session_id", self.id.to_string()));
        }
        Ok(())
    }

    /// Sessions cannot be deleted while they are live.
    pub fn ensure_deletable(&self) -> Result<(), DomainError> {
        if self.is_live() {
            return Err(DomainError::invalid_state("Close the session before deleting it"));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Draft -> Open with the given join code.
    pub fn start(&mut self, code: SessionCode, now: Timestamp) -> Result<(), DomainError> {
        self.state = self.state.transition_to(SessionState::Open)?;
        self.code = Some(code);
        self.start_time = Some(now);
        self.end_time = Some(now.plus_hours(SESSION_WINDOW_HOURS));
        Ok(())
    }

    /// Open -> Archived, archiving every open activity.
    ///
    /// Returns how many activities were archived by the cascade.
    pub fn close(&mut self, now: Timestamp) -> Result<usize, DomainError> {
        self.state = self.state.transition_to(SessionState::Archived)?;
        let cascaded = self
            .activities
            .iter_mut()
            .map(Activity::archive_if_open)
            .filter(|changed| *changed)
            .count();
        self.end_time = Some(now);
        Ok(cascaded)
    }

    /// Renames or regroups a draft session.
    pub fn edit(
        &mut self,
        name: Option<&str>,
        group: Option<Option<String>>,
    ) -> Result<(), DomainError> {
        self.ensure_state(SessionState::Draft)?;
        let name = name.map(Self::validate_name).transpose()?;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(group) = group {
            self.group = group;
        }
        Ok(())
    }

    /// Counts a participant joining. Returns the new total.
    pub fn record_join(&mut self) -> Result<u32, DomainError> {
        self.ensure_state(SessionState::Open)?;
        self.num_joined = self.num_joined.saturating_add(1);
        Ok(self.num_joined)
    }

    pub(crate) fn set_num_joined(&mut self, num_joined: u32) {
        self.num_joined = num_joined;
    }

    pub(crate) fn touch(&mut self, now: Timestamp) {
        self.updated_at = now;
    }

    /// Draft copy named `new_name` with fresh ids, zeroed counters and a new
    /// Q&A board.
    pub fn duplicate(&self, new_name: &str) -> Result<Session, DomainError> {
        if self.is_live() {
            return Err(DomainError::invalid_state("Open sessions cannot be duplicated"));
        }
        let mut copy = Session::new(self.author_id.clone(), new_name, self.group.clone())?;
        copy.activities = self.activities.iter().map(Activity::duplicate).collect();
        Ok(copy)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Activities
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a draft activity with a name unique within this session.
    pub fn add_activity(&mut self, name: &str, kind: ActivityKind) -> Result<ActivityId, DomainError> {
        self.ensure_not_archived()?;
        let activity = Activity::new(name, kind)?;
        if self.activities.iter().any(|a| a.name() == activity.name()) {
            return Err(DomainError::new(
                ErrorCode::ActivityNameTaken,
                "An activity with the same name already exists",
            )
            .with_detail("name", activity.name()));
        }
        let id = activity.id();
        self.activities.push(activity);
        Ok(id)
    }

    /// Finds an activity by id.
    pub fn activity(&self, id: ActivityId) -> Result<&Activity, DomainError> {
        self.activities
            .iter()
            .find(|a| a.id() == id)
            .ok_or_else(|| activity_not_found(id))
    }

    /// Mutable access to an activity; archived sessions refuse.
    pub fn activity_mut(&mut self, id: ActivityId) -> Result<&mut Activity, DomainError> {
        self.activity(id)?;
        self.ensure_not_archived()?;
        self.activities
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or_else(|| activity_not_found(id))
    }

    /// Opens an activity; the session itself must be open.
    pub fn open_activity(&mut self, id: ActivityId) -> Result<(), DomainError> {
        self.activity(id)?;
        self.ensure_state(SessionState::Open)?;
        self.activity_mut(id)?.open()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Q&A
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_qna_open(&mut self, open: bool) -> Result<(), DomainError> {
        self.ensure_state(SessionState::Open)?;
        self.qna.set_open(open);
        Ok(())
    }

    pub fn submit_question(
        &mut self,
        text: &str,
        author_name: Option<&str>,
        now: Timestamp,
    ) -> Result<QuestionId, DomainError> {
        self.ensure_state(SessionState::Open)?;
        self.qna.submit(text, author_name, now)
    }

    pub fn mark_question(&mut self, question_id: QuestionId, read: bool) -> Result<(), DomainError> {
        self.ensure_state(SessionState::Open)?;
        self.qna.mark(question_id, read)
    }
}

fn activity_not_found(id: ActivityId) -> DomainError {
    DomainError::new(ErrorCode::ActivityNotFound, "Activity does not exist")
        .with_detail("activity_id", id.to_string())
}
