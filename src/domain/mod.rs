//! Domain layer - business logic with no infrastructure dependencies.

pub mod activity;
pub mod foundation;
pub mod session;
