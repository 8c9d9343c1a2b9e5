//! SessionState enum for the live-session lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle state of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Draft,
    Open,
    Archived,
}

impl SessionState {
    /// Returns the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Draft => "draft",
            SessionState::Open => "open",
            SessionState::Archived => "archived",
        }
    }

    /// Parses the persisted representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(SessionState::Draft),
            "open" => Some(SessionState::Open),
            "archived" => Some(SessionState::Archived),
            _ => None,
        }
    }
}

impl StateMachine for SessionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionState::*;
        matches!((self, target), (Draft, Open) | (Open, Archived))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionState::*;
        match self {
            Draft => vec![Open],
            Open => vec![Archived],
            Archived => vec![],
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archived_is_terminal() {
        assert!(SessionState::Archived.is_terminal());
        assert!(!SessionState::Open.is_terminal());
    }

    #[test]
    fn draft_cannot_close_directly() {
        assert!(!SessionState::Draft.can_transition_to(&SessionState::Archived));
    }

    #[test]
    fn open_cannot_reopen() {
        assert!(SessionState::Open.transition_to(SessionState::Open).is_err());
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(SessionState::Open.to_string(), "open");
    }
}
