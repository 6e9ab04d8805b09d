//! Resume support via a persisted "last successful date"
//!
//! Provides the checkpoint record, its update policy, and an atomic,
//! lock-guarded file store.

pub mod checkpoint;
pub mod lock;
pub mod store;

pub use checkpoint::{CheckpointPolicy, CheckpointRecord};
pub use store::{CheckpointError, CheckpointStore, DEFAULT_CHECKPOINT_FILE, MAX_RECORD_SIZE};
