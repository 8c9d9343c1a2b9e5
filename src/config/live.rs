//! Live session configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::pubsub::DEFAULT_CHANNEL_CAPACITY;

/// Tuning of the in-memory side of open sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    /// Seconds between checkpoints of dirty live sessions. 0 disables the
    /// periodic checkpointer; sessions are then only written on explicit
    /// persistence, close and shutdown.
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval_secs: u64,

    /// Buffered updates per session topic before slow subscribers lag.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl LiveConfig {
    /// Checkpoint interval, or `None` when disabled.
    pub fn checkpoint_interval(&self) -> Option<Duration> {
        (self.checkpoint_interval_secs > 0).then(|| Duration::from_secs(self.checkpoint_interval_secs))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.checkpoint_interval_secs > 3600 {
            return Err(ValidationError::CheckpointIntervalTooLong);
        }
        if self.channel_capacity == 0 || self.channel_capacity > 65536 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        Ok(())
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval_secs: default_checkpoint_interval(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_checkpoint_interval() -> u64 {
    30
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LiveConfig::default();
        assert_eq!(config.checkpoint_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.channel_capacity, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_disables_checkpointer() {
        let config = LiveConfig {
            checkpoint_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.checkpoint_interval(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bounds_are_checked() {
        let slow = LiveConfig {
            checkpoint_interval_secs: 7200,
            ..Default::default()
        };
        assert_eq!(slow.validate(), Err(ValidationError::CheckpointIntervalTooLong));

        let unbuffered = LiveConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert_eq!(unbuffered.validate(), Err(ValidationError::InvalidChannelCapacity));
    }
}
