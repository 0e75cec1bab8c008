//! Scheduler error taxonomy

use thiserror::Error;

use crate::domain::TaskStatus;

/// Errors from scheduler operations
///
/// Execution faults are not represented here: they are contained inside
/// the worker wrapper and recorded on the task record's error field.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Identifier collision at admission. The ID generation scheme makes
    /// this unreachable in practice; seeing it means a programming error.
    #[error("Duplicate task ID: {0}")]
    DuplicateTask(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task {id} is {status}; cannot cancel a terminal task")]
    InvalidState { id: String, status: TaskStatus },
}
