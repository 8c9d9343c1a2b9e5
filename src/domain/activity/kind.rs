//! Activity kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{DomainError, ErrorCode};

/// The kind of an activity, which fixes the shape of its choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    #[serde(rename = "POLL")]
    Poll,
    #[serde(rename = "QUIZ")]
    Quiz,
    #[serde(rename = "DND")]
    DragAndDrop,
}

impl ActivityKind {
    /// Returns the persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Poll => "POLL",
            ActivityKind::Quiz => "QUIZ",
            ActivityKind::DragAndDrop => "DND",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = DomainError;

    /// Parses a kind case-insensitively, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POLL" => Ok(ActivityKind::Poll),
            "QUIZ" => Ok(ActivityKind::Quiz),
            "DND" | "DRAG_AND_DROP" => Ok(ActivityKind::DragAndDrop),
            other => Err(DomainError::new(
                ErrorCode::UnknownActivityKind,
                format!("An activity of kind '{}' can not be created", other),
            )),
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" poll ".parse::<ActivityKind>().unwrap(), ActivityKind::Poll);
        assert_eq!("Quiz".parse::<ActivityKind>().unwrap(), ActivityKind::Quiz);
        assert_eq!("dnd".parse::<ActivityKind>().unwrap(), ActivityKind::DragAndDrop);
        assert_eq!(
            "drag_and_drop".parse::<ActivityKind>().unwrap(),
            ActivityKind::DragAndDrop
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "survey".parse::<ActivityKind>().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownActivityKind);
    }

    #[test]
    fn as_str_parses_back() {
        for kind in [ActivityKind::Poll, ActivityKind::Quiz, ActivityKind::DragAndDrop] {
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), kind);
        }
    }
}
