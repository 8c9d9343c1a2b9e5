//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the error taxonomy and the
//! state machine trait that form the vocabulary of the Lectern domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ErrorKind, ValidationError};
pub use ids::{ActivityId, ChoiceId, QnaId, QuestionId, SessionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
