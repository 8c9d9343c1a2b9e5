//! Application layer - the broker, the live registry and the service
//! operations built on them.
//!
//! Handlers never touch the store or a live handle directly; every read
//! and mutation of a session goes through the [`SessionBroker`].

mod broker;
pub mod handlers;
pub mod live;
mod service;
mod subscription;

pub use broker::{Commit, SessionBroker};
pub use handlers::{
    ActivityCommand, AddChoicesCommand, CastVoteCommand, CloseSessionResult,
    CreateActivityCommand, CreateSessionCommand, DuplicateSessionCommand, EditChoiceCommand,
    EditSessionCommand, JoinSessionResult, MarkQuestionCommand, RemoveChoiceCommand,
    SessionCommand, SubmitQuestionCommand, ToggleQnaCommand,
};
pub use live::{Checkpointer, CheckpointerConfig, CheckpointReport, LiveHandle, LiveRegistry};
pub use service::LiveSessionService;
pub use subscription::SessionSubscription;
