//! Command and query handlers of the live session service.
//!
//! Each module adds one group of operations to [`LiveSessionService`]:
//!
//! - `session` - create, edit, start, close, delete, duplicate, join
//! - `activity` - authoring, lifecycle and results of activities
//! - `vote` - participant votes
//! - `qna` - the question board
//!
//! [`LiveSessionService`]: super::LiveSessionService

mod activity;
mod qna;
mod session;
mod vote;

pub use activity::{
    ActivityCommand, AddChoicesCommand, CreateActivityCommand, EditChoiceCommand,
    RemoveChoiceCommand,
};
pub use qna::{MarkQuestionCommand, SubmitQuestionCommand, ToggleQnaCommand};
pub use session::{
    CloseSessionResult, CreateSessionCommand, DuplicateSessionCommand, EditSessionCommand,
    JoinSessionResult, SessionCommand,
};
pub use vote::CastVoteCommand;
