//! CodeGenerator port - source of join codes for starting sessions.

use crate::domain::session::SessionCode;

/// Produces candidate join codes. Uniqueness is checked by the caller.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> SessionCode;
}
