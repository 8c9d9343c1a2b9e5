//! Activity module - polls, quizzes and drag-and-drop orderings.
//!
//! Activities are entities owned by a session. Their lifecycle is
//! Draft -> Open -> Archived, with Archived -> Draft as a reset.

mod aggregate;
mod choice;
mod kind;
mod result;
mod state;

pub use aggregate::Activity;
pub use choice::{Choice, ChoiceEdit, ChoicePayload, NewChoice};
pub use kind::ActivityKind;
pub use result::{ActivityResult, ChoiceTally, PositionTally};
pub use state::ActivityState;
