//! Live layer - in-memory representation of open sessions.

mod checkpointer;
mod gates;
mod handle;
mod registry;

pub use checkpointer::{Checkpointer, CheckpointerConfig};
pub use gates::SessionGates;
pub use handle::{LiveHandle, LiveState};
pub use registry::{CheckpointReport, LiveRegistry};
