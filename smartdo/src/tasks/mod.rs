//! The task list: reconciliation, ordering, classification and the store
//! object that owns it.

pub mod classify;
pub mod manager;
pub mod ordering;
pub mod reconcile;
pub mod reorder;

pub use classify::{BoardStats, Bucket, Buckets, DayBounds, classify};
pub use manager::{ApplyOutcome, RequestTicket, SubscriptionId, TaskManager};
pub use reconcile::{reconcile_subtasks, reconcile_tasks};
pub use reorder::{DropUpdate, resolve_drop};

use smartdo_proto::codec::CodecError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during task operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task with the given ID was not found.
    #[error("task not found: {0}")]
    TaskNotFound(String),
    /// No subtask with the given ID exists under the task.
    #[error("subtask {subtask} not found in task {task}")]
    SubtaskNotFound {
        /// Owning task.
        task: String,
        /// Missing subtask.
        subtask: String,
    },
    /// The durable store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The stored document could not be encoded or decoded.
    #[error("task list document: {0}")]
    Codec(#[from] CodecError),
}
