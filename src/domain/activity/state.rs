//! ActivityState enum for the activity lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle state of an activity within a session.
///
/// Draft activities are edited by the author, Open activities accept votes,
/// Archived activities expose results and may be reset back to Draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    #[default]
    Draft,
    Open,
    Archived,
}

impl ActivityState {
    /// Returns the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityState::Draft => "draft",
            ActivityState::Open => "open",
            ActivityState::Archived => "archived",
        }
    }

    /// Parses the persisted representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ActivityState::Draft),
            "open" => Some(ActivityState::Open),
            "archived" => Some(ActivityState::Archived),
            _ => None,
        }
    }
}

impl StateMachine for ActivityState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ActivityState::*;
        matches!(
            (self, target),
            (Draft, Open) | (Open, Archived) | (Archived, Draft)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ActivityState::*;
        match self {
            Draft => vec![Open],
            Open => vec![Archived],
            Archived => vec![Draft],
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
