//! Washsync - Offline-first wash task completion for fleet drivers
//!
//! This crate provides a unified API for the washsync client.
//!
//! # Example
//!
//! ```ignore
//! use washsync::{ClientConfig, WashClient};
//!
//! let client = WashClient::new(ClientConfig::default(), backend, notifier, rx).await?;
//! client.init().await?;
//!
//! let today = chrono::Local::now().date_naive();
//! client.complete_task("schedule-1", today, "/photos/wash.jpg", None).await?;
//! ```

// Re-export client types
pub use washsync_client::{
    ClientConfig, CompletionOutcome, DrainOutcome, DurableStore, EventDispatcher, Notifier,
    SqliteStore, TaskBackend, TaskEvent, TaskSnapshot, WashClient,
};

// Re-export core types that external applications may need
pub use washsync_core::errors::{NotifyError, SyncError};
pub use washsync_core::models::{
    CacheEntry, CompletedByType, PendingCompletion, ReminderPayload, Task, TaskStatus, VehicleInfo,
};
pub use washsync_core::SyncResult;
