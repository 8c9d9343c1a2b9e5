//! Lectern - live classroom session broker
//!
//! Sessions carry polls, quizzes, drag-and-drop orderings and a Q&A board.
//! While a session is open it is served from an in-memory handle that
//! serializes every mutation and fans changes out to subscribers; drafts
//! and archived sessions live only in the durable store.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
