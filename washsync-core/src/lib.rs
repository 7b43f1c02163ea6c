pub mod errors;
pub mod models;

pub use errors::*;
pub use models::*;

/// Result alias used across the workspace.
pub type SyncResult<T> = Result<T, errors::SyncError>;
