//! Session module - the live classroom session aggregate.
//!
//! Sessions move Draft -> Open -> Archived. While Open they are served from
//! a live in-memory handle; otherwise from the durable store.

mod aggregate;
mod code;
mod qna;
mod state;
mod update;

pub use aggregate::{Session, SESSION_WINDOW_HOURS};
pub use code::{SessionCode, CODE_LENGTH};
pub use qna::{Qna, Question};
pub use state::SessionState;
pub use update::{topic_for, SessionUpdate};
