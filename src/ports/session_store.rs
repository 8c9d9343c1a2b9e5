//! Session store port.
//!
//! Defines the contract for the durable record of Session aggregates. A
//! session is always loaded and saved whole: activities, choices, the Q&A
//! board and its questions travel with it.

use crate::domain::foundation::{DomainError, SessionId, UserId};
use crate::domain::session::{Session, SessionCode};
use async_trait::async_trait;
use std::fmt;

/// How a caller addresses a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(SessionId),
    Code(SessionCode),
}

impl From<SessionId> for Locator {
    fn from(id: SessionId) -> Self {
        Locator::Id(id)
    }
}

impl From<SessionCode> for Locator {
    fn from(code: SessionCode) -> Self {
        Locator::Code(code)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "id={}", id),
            Locator::Code(code) => write!(f, "code={}", code),
        }
    }
}

/// Associations that must be read fresh from the store.
///
/// Asking for any relation bypasses the live fast path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// The author's account record.
    Author,
}

/// Store port for Session aggregate persistence.
///
/// Implementations must ensure:
/// - `save` is atomic for the whole aggregate
/// - unique violations on join code or per-author name surface as
///   `Conflict` errors, every other failure as `StoreFailure`
/// - `num_joined` is never persisted
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Find one session by id or code.
    ///
    /// Returns `None` if not found.
    async fn find_one(
        &self,
        locator: &Locator,
        relations: &[Relation],
    ) -> Result<Option<Session>, DomainError>;

    /// All sessions whose durable state is Open.
    async fn find_open(&self) -> Result<Vec<Session>, DomainError>;

    /// All sessions authored by `author`, most recently updated first.
    async fn find_by_author(&self, author: &UserId) -> Result<Vec<Session>, DomainError>;

    /// Insert or replace the whole aggregate.
    ///
    /// # Errors
    ///
    /// - `SessionCodeTaken` / `SessionNameTaken` on unique violations
    /// - `StoreFailure` on any other persistence failure
    async fn save(&self, session: &Session) -> Result<(), DomainError>;

    /// Delete a session and everything it owns.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    async fn delete(&self, id: SessionId) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn SessionStore) {}
    }

    #[test]
    fn locator_displays_its_key() {
        let code = SessionCode::new("ABC123").unwrap();
        assert_eq!(Locator::from(code).to_string(), "code=ABC123");
    }
}
