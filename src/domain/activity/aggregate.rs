//! Activity entity.
//!
//! Activities live inside a session and are only reachable through it. The
//! session guards session-level preconditions (for example, an activity can
//! only open while its session is open); everything that depends solely on
//! the activity itself is enforced here.
//!
//! # Invariants
//!
//! - every choice payload matches `kind`
//! - choices are editable only while `state` is Draft
//! - votes are recorded only while `state` is Open

use serde::{Deserialize, Serialize};

use super::choice::{choice_not_found, normalize_choice_name};
use super::{ActivityKind, ActivityResult, ActivityState, Choice, ChoiceEdit, ChoicePayload, NewChoice};
use crate::domain::foundation::{ActivityId, ChoiceId, DomainError, ErrorCode, StateMachine};

/// A poll, quiz or drag-and-drop ordering task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    id: ActivityId,
    name: String,
    kind: ActivityKind,
    state: ActivityState,
    choices: Vec<Choice>,
}

impl Activity {
    /// Create a new draft activity with no choices.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the trimmed name is empty
    pub fn new(name: &str, kind: ActivityKind) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name", "Activity name cannot be empty"));
        }
        Ok(Self {
            id: ActivityId::new(),
            name: name.to_string(),
            kind,
            state: ActivityState::Draft,
            choices: Vec::new(),
        })
    }

    /// Reconstitute an activity from persistence (no validation).
    pub fn reconstitute(
        id: ActivityId,
        name: String,
        kind: ActivityKind,
        state: ActivityState,
        choices: Vec<Choice>,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            state,
            choices,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> ActivityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Finds a choice by id.
    pub fn choice(&self, id: ChoiceId) -> Result<&Choice, DomainError> {
        self.choices
            .iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| choice_not_found(id))
    }

    fn choice_mut(&mut self, id: ChoiceId) -> Result<&mut Choice, DomainError> {
        self.choices
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| choice_not_found(id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Draft editing
    // ─────────────────────────────────────────────────────────────────────────

    fn ensure_draft(&self) -> Result<(), DomainError> {
        if self.state != ActivityState::Draft {
            return Err(DomainError::invalid_state(format!(
                "Activity '{}' is {} and can no longer be edited",
                self.name, self.state
            )));
        }
        Ok(())
    }

    /// Appends choices, initialising each payload for this activity's kind.
    ///
    /// Drag-and-drop choices get their insertion index as correct position.
    /// Returns the ids of the new choices in input order.
    pub fn add_choices(&mut self, choices: Vec<NewChoice>) -> Result<Vec<ChoiceId>, DomainError> {
        self.ensure_draft()?;

        let mut prepared = Vec::with_capacity(choices.len());
        for (offset, input) in choices.into_iter().enumerate() {
            let name = normalize_choice_name(&input.name)?;
            let payload =
                ChoicePayload::initial(self.kind, input.is_correct, self.choices.len() + offset);
            prepared.push(Choice::new(name, payload));
        }

        let ids = prepared.iter().map(Choice::id).collect();
        self.choices.extend(prepared);
        Ok(ids)
    }

    /// Applies a partial edit to one choice.
    ///
    /// Fields that do not apply to the activity's kind are ignored; at least
    /// one applicable field must be present.
    pub fn edit_choice(&mut self, choice_id: ChoiceId, edit: ChoiceEdit) -> Result<(), DomainError> {
        self.choice(choice_id)?;
        self.ensure_draft()?;

        let applicable = match self.kind {
            ActivityKind::Poll => edit.name.is_some(),
            ActivityKind::Quiz => edit.name.is_some() || edit.is_correct.is_some(),
            ActivityKind::DragAndDrop => edit.name.is_some() || edit.correct_position.is_some(),
        };
        if !applicable {
            return Err(DomainError::validation(
                "edit",
                format!("No applicable field provided for a {} choice", self.kind),
            ));
        }

        let name = edit.name.as_deref().map(normalize_choice_name).transpose()?;
        let choice_count = self.choices.len();
        if let (ActivityKind::DragAndDrop, Some(position)) = (self.kind, edit.correct_position) {
            if position >= choice_count {
                return Err(DomainError::validation(
                    "correct_position",
                    format!("Position {} is out of range for {} choices", position, choice_count),
                ));
            }
        }

        let choice = self.choice_mut(choice_id)?;
        if let Some(name) = name {
            choice.rename(name);
        }
        match choice.payload_mut() {
            ChoicePayload::Quiz { is_correct, .. } => {
                if let Some(value) = edit.is_correct {
                    *is_correct = value;
                }
            }
            ChoicePayload::DragAndDrop {
                correct_position, ..
            } => {
                if let Some(position) = edit.correct_position {
                    *correct_position = Some(position);
                }
            }
            ChoicePayload::Poll { .. } => {}
        }
        Ok(())
    }

    /// Removes one choice from a draft activity.
    ///
    /// Drag-and-drop positions after the removed one shift down so the
    /// remaining choices still cover `0..len`.
    pub fn remove_choice(&mut self, choice_id: ChoiceId) -> Result<(), DomainError> {
        let removed = match self.choice(choice_id)?.payload() {
            ChoicePayload::DragAndDrop {
                correct_position, ..
            } => *correct_position,
            _ => None,
        };
        self.ensure_draft()?;
        self.choices.retain(|c| c.id() != choice_id);

        if let Some(removed) = removed {
            for choice in &mut self.choices {
                if let ChoicePayload::DragAndDrop {
                    correct_position: Some(position),
                    ..
                } = choice.payload_mut()
                {
                    if *position > removed {
                        *position -= 1;
                    }
                }
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Checks per-kind readiness without changing anything.
    pub fn ensure_ready(&self) -> Result<(), DomainError> {
        if self.choices.is_empty() {
            return Err(DomainError::invalid_state("Activity has no choices"));
        }
        if self.choices.iter().any(|c| c.payload().kind() != self.kind) {
            return Err(DomainError::invalid_state(
                "Activity has choices that do not match its kind",
            ));
        }
        match self.kind {
            ActivityKind::Poll => {}
            ActivityKind::Quiz => {
                let has_answer = self.choices.iter().any(|c| {
                    matches!(c.payload(), ChoicePayload::Quiz { is_correct: true, .. })
                });
                if !has_answer {
                    return Err(DomainError::invalid_state("Your quiz has no correct answer"));
                }
            }
            ActivityKind::DragAndDrop => {
                // Correct positions must be a permutation of 0..len.
                let mut positions: Vec<Option<usize>> = self
                    .choices
                    .iter()
                    .map(|c| match c.payload() {
                        ChoicePayload::DragAndDrop {
                            correct_position, ..
                        } => *correct_position,
                        _ => None,
                    })
                    .collect();
                positions.sort_unstable();
                let ordered = positions
                    .iter()
                    .enumerate()
                    .all(|(index, position)| *position == Some(index));
                if !ordered {
                    return Err(DomainError::invalid_state(
                        "Every position needs exactly one correct choice",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Draft -> Open. Sizes drag-and-drop vote arrays to one slot per position.
    pub fn open(&mut self) -> Result<(), DomainError> {
        let next = self.state.transition_to(ActivityState::Open)?;
        self.ensure_ready()?;

        let slots = self.choices.len();
        for choice in &mut self.choices {
            if let ChoicePayload::DragAndDrop { votes, .. } = choice.payload_mut() {
                *votes = vec![0; slots];
            }
        }
        self.state = next;
        Ok(())
    }

    /// Open -> Archived.
    pub fn close(&mut self) -> Result<(), DomainError> {
        self.state = self.state.transition_to(ActivityState::Archived)?;
        Ok(())
    }

    /// Archives the activity if it is open. Returns whether it changed.
    pub fn archive_if_open(&mut self) -> bool {
        if self.state == ActivityState::Open {
            self.state = ActivityState::Archived;
            true
        } else {
            false
        }
    }

    /// Archived -> Draft, zeroing every counter.
    pub fn reset(&mut self) -> Result<(), DomainError> {
        let next = self.state.transition_to(ActivityState::Draft)?;
        if self.choices.is_empty() {
            return Err(DomainError::invalid_state("Activity has no choices"));
        }
        for choice in &mut self.choices {
            choice.payload_mut().reset();
        }
        self.state = next;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Voting and results
    // ─────────────────────────────────────────────────────────────────────────

    /// Records one vote for `choice_id`.
    ///
    /// `position` is required for drag-and-drop activities and ignored
    /// otherwise. No deduplication of voters happens here.
    pub fn record_vote(
        &mut self,
        choice_id: ChoiceId,
        position: Option<usize>,
    ) -> Result<(), DomainError> {
        if self.state != ActivityState::Open {
            return Err(DomainError::invalid_state(format!(
                "Activity '{}' is not accepting votes",
                self.name
            )));
        }
        let kind = self.kind;
        let choice = self.choice_mut(choice_id)?;
        if choice.payload().kind() != kind {
            return Err(invalid_choice("Choice does not match the activity kind"));
        }

        match choice.payload_mut() {
            ChoicePayload::Poll { votes } | ChoicePayload::Quiz { votes, .. } => {
                *votes = votes.saturating_add(1);
            }
            ChoicePayload::DragAndDrop { votes, .. } => {
                let position =
                    position.ok_or_else(|| invalid_choice("A position is required"))?;
                let slot = votes
                    .get_mut(position)
                    .ok_or_else(|| invalid_choice("Position is out of range"))?;
                *slot = slot.saturating_add(1);
            }
        }
        Ok(())
    }

    /// Tallies an archived activity.
    pub fn result(&self) -> Result<ActivityResult, DomainError> {
        if self.state != ActivityState::Archived {
            return Err(DomainError::invalid_state(
                "Activity must be archived before you can get the result",
            ));
        }
        Ok(ActivityResult::aggregate(self))
    }

    /// Draft copy with fresh ids and zeroed counters.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ActivityId::new(),
            name: self.name.clone(),
            kind: self.kind,
            state: ActivityState::Draft,
            choices: self.choices.iter().map(Choice::duplicate).collect(),
        }
    }
}

fn invalid_choice(message: &str) -> DomainError {
    DomainError::new(ErrorCode::InvalidChoice, message)
}
