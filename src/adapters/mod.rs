//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `memory` - map-backed session store
//! - `postgres` - sqlx session store and schema migrations
//! - `pubsub` - in-process per-session topics
//! - `code` - join code generators

pub mod code;
pub mod memory;
pub mod postgres;
pub mod pubsub;

pub use code::{FixedCodeGenerator, RandomCodeGenerator};
pub use memory::InMemorySessionStore;
pub use postgres::{run_migrations, PostgresSessionStore};
pub use pubsub::TopicBroker;
