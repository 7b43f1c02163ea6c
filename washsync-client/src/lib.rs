pub mod backend;
pub mod cache;
pub mod client;
pub mod connectivity;
pub mod events;
pub mod notifications;
pub mod offline_queue;
pub mod queries;
pub mod reminders;
pub mod store;
pub mod sync;
pub mod tasks;

pub use backend::TaskBackend;
pub use client::{ClientConfig, WashClient};
pub use events::{EventDispatcher, TaskEvent};
pub use notifications::{NotificationId, Notifier, ScheduledNotification};
pub use store::{DurableStore, SqliteStore};
pub use sync::{CompletionOutcome, DrainOutcome};
pub use tasks::TaskSnapshot;

/// Console logging for embedding apps and test binaries. Honors `RUST_LOG`;
/// defaults to info with debug for the sync crates.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,washsync_client=debug,washsync_core=debug".to_string()),
        )
        .try_init();
}
