use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task already completed: {0}")]
    AlreadyCompleted(String),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Failed to acquire lock: {0}")]
    Lock(String),
}

/// Errors surfaced by the host notification service. Permission denial is
/// its own variant because the reminder scheduler degrades silently on it
/// instead of propagating.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Host notification service error: {0}")]
    Host(String),
}
