//! Checkpointer - background writer for dirty live sessions.
//!
//! Votes and joins commit to the live handle only. This task periodically
//! writes those handles back to the store so a crash loses at most one
//! interval of changes.
//!
//! ## Graceful Shutdown
//!
//! The task listens on a `watch` channel and flushes every dirty handle
//! once more before stopping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use super::{CheckpointReport, LiveRegistry};
use crate::ports::SessionStore;

/// Configuration for the Checkpointer task.
#[derive(Debug, Clone)]
pub struct CheckpointerConfig {
    /// How often dirty handles are written.
    pub interval: Duration,
}

impl Default for CheckpointerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

impl CheckpointerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Periodically checkpoints the live registry.
pub struct Checkpointer {
    registry: Arc<LiveRegistry>,
    store: Arc<dyn SessionStore>,
    config: CheckpointerConfig,
}

impl Checkpointer {
    pub fn new(registry: Arc<LiveRegistry>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_config(registry, store, CheckpointerConfig::default())
    }

    pub fn with_config(
        registry: Arc<LiveRegistry>,
        store: Arc<dyn SessionStore>,
        config: CheckpointerConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    /// Run until the shutdown signal flips to `true`.
    ///
    /// Failed checkpoints are logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> CheckpointReport {
        let mut interval = time::interval(self.config.interval);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return self.checkpoint_once().await;
                    }
                }

                _ = interval.tick() => {
                    self.checkpoint_once().await;
                }
            }
        }
    }

    /// Run exactly one checkpoint pass.
    pub async fn checkpoint_once(&self) -> CheckpointReport {
        self.registry.checkpoint_all(self.store.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemorySessionStore;
    use crate::application::live::LiveHandle;
    use crate::domain::foundation::{Timestamp, UserId};
    use crate::domain::session::{Session, SessionCode};

    async fn dirty_registry() -> Arc<LiveRegistry> {
        let mut session = Session::new(UserId::new("a").unwrap(), "Live", None).unwrap();
        session
            .start(SessionCode::new("TICK01").unwrap(), Timestamp::now())
            .unwrap();
        let handle = Arc::new(LiveHandle::new(session));
        handle.lock().await.dirty = true;
        let registry = Arc::new(LiveRegistry::new());
        registry.register(handle).await.unwrap();
        registry
    }

    #[tokio::test]
    async fn checkpoint_once_writes_dirty_handles() {
        let store = Arc::new(InMemorySessionStore::new());
        let checkpointer = Checkpointer::new(dirty_registry().await, store.clone());

        let report = checkpointer.checkpoint_once().await;
        assert_eq!(report.written, 1);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn shutdown_flushes_before_stopping() {
        let store = Arc::new(InMemorySessionStore::new());
        let checkpointer = Checkpointer::with_config(
            dirty_registry().await,
            store.clone(),
            CheckpointerConfig::default().with_interval(Duration::from_secs(3600)),
        );
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move { checkpointer.run(rx).await });
        tx.send(true).unwrap();

        let report = task.await.unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(store.save_count(), 1);
    }
}
