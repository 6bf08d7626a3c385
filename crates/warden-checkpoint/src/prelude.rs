//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_checkpoint::prelude::*;` to import all essential types.

pub use crate::{
    Checkpoint, CheckpointId, CheckpointManager, FileSnapshot, RetentionPolicy, RollbackEngine,
    RollbackReport, SnapshotId, SnapshotStore,
};
