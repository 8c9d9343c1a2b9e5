//! Pub/sub adapters for session change notification.

mod topic_broker;

pub use topic_broker::{TopicBroker, DEFAULT_CHANNEL_CAPACITY};
