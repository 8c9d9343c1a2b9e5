//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `SessionStore` - durable record of session aggregates
//! - `SessionPublisher` - per-session change notification
//! - `CodeGenerator` - join codes for starting sessions

mod code_generator;
mod session_publisher;
mod session_store;

pub use code_generator::CodeGenerator;
pub use session_publisher::SessionPublisher;
pub use session_store::{Locator, Relation, SessionStore};
