//! Choices and their kind-specific vote payloads.

use serde::{Deserialize, Serialize};

use super::ActivityKind;
use crate::domain::foundation::{ChoiceId, DomainError, ErrorCode};

/// Vote payload of a choice, shaped by the owning activity's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChoicePayload {
    Poll {
        votes: u32,
    },
    Quiz {
        votes: u32,
        is_correct: bool,
    },
    #[serde(rename = "DND")]
    DragAndDrop {
        correct_position: Option<usize>,
        /// One counter per position, sized when the activity opens.
        votes: Vec<u32>,
    },
}

impl ChoicePayload {
    /// Fresh payload for a choice inserted at `index` of an activity of `kind`.
    pub fn initial(kind: ActivityKind, is_correct: Option<bool>, index: usize) -> Self {
        match kind {
            ActivityKind::Poll => ChoicePayload::Poll { votes: 0 },
            ActivityKind::Quiz => ChoicePayload::Quiz {
                votes: 0,
                is_correct: is_correct.unwrap_or(false),
            },
            ActivityKind::DragAndDrop => ChoicePayload::DragAndDrop {
                correct_position: Some(index),
                votes: Vec::new(),
            },
        }
    }

    /// The activity kind this payload belongs to.
    pub fn kind(&self) -> ActivityKind {
        match self {
            ChoicePayload::Poll { .. } => ActivityKind::Poll,
            ChoicePayload::Quiz { .. } => ActivityKind::Quiz,
            ChoicePayload::DragAndDrop { .. } => ActivityKind::DragAndDrop,
        }
    }

    /// Zeroes every counter, keeping correctness and position metadata.
    pub fn reset(&mut self) {
        match self {
            ChoicePayload::Poll { votes } | ChoicePayload::Quiz { votes, .. } => *votes = 0,
            ChoicePayload::DragAndDrop { votes, .. } => votes.clear(),
        }
    }

    /// Total votes across all counters.
    pub fn total_votes(&self) -> u64 {
        match self {
            ChoicePayload::Poll { votes } | ChoicePayload::Quiz { votes, .. } => *votes as u64,
            ChoicePayload::DragAndDrop { votes, .. } => votes.iter().map(|v| *v as u64).sum(),
        }
    }
}

/// One selectable option of an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    id: ChoiceId,
    name: String,
    payload: ChoicePayload,
}

impl Choice {
    /// Creates a choice with a fresh id.
    pub fn new(name: String, payload: ChoicePayload) -> Self {
        Self {
            id: ChoiceId::new(),
            name,
            payload,
        }
    }

    /// Reconstitute a choice from persistence.
    pub fn reconstitute(id: ChoiceId, name: String, payload: ChoicePayload) -> Self {
        Self { id, name, payload }
    }

    pub fn id(&self) -> ChoiceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &ChoicePayload {
        &self.payload
    }

    pub(crate) fn payload_mut(&mut self) -> &mut ChoicePayload {
        &mut self.payload
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    /// Copy with a fresh id and zeroed counters.
    pub(crate) fn duplicate(&self) -> Self {
        let mut payload = self.payload.clone();
        payload.reset();
        Self::new(self.name.clone(), payload)
    }
}

/// Input for adding a choice to a draft activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChoice {
    pub name: String,
    /// Only meaningful for quizzes; defaults to false.
    #[serde(default)]
    pub is_correct: Option<bool>,
}

impl NewChoice {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_correct: None,
        }
    }

    pub fn correct(name: impl Into<String>, is_correct: bool) -> Self {
        Self {
            name: name.into(),
            is_correct: Some(is_correct),
        }
    }
}

/// Partial edit of an existing choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceEdit {
    pub name: Option<String>,
    pub correct_position: Option<usize>,
    pub is_correct: Option<bool>,
}

/// Trims a choice name, rejecting blanks.
pub(crate) fn normalize_choice_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name", "Choice name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn choice_not_found(id: ChoiceId) -> DomainError {
    DomainError::new(ErrorCode::ChoiceNotFound, "Choice does not exist")
        .with_detail("choice_id", id.to_string())
}
