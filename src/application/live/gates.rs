//! Per-session gates serializing durable-path mutations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::SessionId;

/// Lazily created async mutex per session id.
///
/// Entries are weak so an id nobody is waiting on costs nothing; dead
/// entries are pruned on the next acquire.
#[derive(Debug, Default)]
pub struct SessionGates {
    gates: Mutex<HashMap<SessionId, Weak<AsyncMutex<()>>>>,
}

impl SessionGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the gate of `session_id`.
    pub async fn acquire(&self, session_id: SessionId) -> OwnedMutexGuard<()> {
        let gate = {
            let mut gates = self
                .gates
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            gates.retain(|_, gate| gate.strong_count() > 0);
            match gates.get(&session_id).and_then(Weak::upgrade) {
                Some(gate) => gate,
                None => {
                    let gate = Arc::new(AsyncMutex::new(()));
                    gates.insert(session_id, Arc::downgrade(&gate));
                    gate
                }
            }
        };
        gate.lock_owned().await
    }

    /// Number of gates currently held or awaited.
    pub fn active(&self) -> usize {
        self.gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|gate| gate.strong_count() > 0)
            .count()
    }
}
