use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use washsync_core::models::{CacheEntry, Task};
use washsync_core::SyncResult;

use crate::backend::TaskBackend;
use crate::cache::TaskCache;
use crate::events::EventDispatcher;

/// What a read resolved to: the task list plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub tasks: Vec<Task>,
    /// When this list was fetched from the backend.
    pub fetched_at: DateTime<Utc>,
    /// False when the list came from the cache because the fetch failed.
    pub fresh: bool,
}

/// Cache-then-revalidate read path. The cached list is published through the
/// dispatcher the moment it is read so the UI renders instantly; the live
/// fetch then replaces it, but only on success.
pub struct TaskReader {
    cache: Arc<TaskCache>,
    backend: Arc<dyn TaskBackend>,
    events: Arc<EventDispatcher>,
}

impl TaskReader {
    pub fn new(
        cache: Arc<TaskCache>,
        backend: Arc<dyn TaskBackend>,
        events: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            cache,
            backend,
            events,
        }
    }

    /// Resolves the task list for one date. Fails only when the fetch fails
    /// and no cached entry exists to fall back on.
    pub async fn get(&self, date_key: NaiveDate) -> SyncResult<TaskSnapshot> {
        let cached = self.cache.get(date_key).await?;
        if let Some(entry) = &cached {
            tracing::debug!(
                "TASKS: Publishing cached snapshot for {} ({} tasks)",
                date_key,
                entry.tasks.len()
            );
            self.events.emit_tasks_published(date_key, &entry.tasks, false);
        }

        match self.backend.fetch_tasks_for_date(date_key).await {
            Ok(tasks) => {
                let entry = CacheEntry::new(date_key, tasks);
                if let Err(e) = self.cache.put(&entry).await {
                    // The fetched list is still good; serve it and let the
                    // next successful read repopulate the cache.
                    tracing::error!(
                        "TASKS: Failed to cache fresh snapshot for {}: {}",
                        date_key,
                        e
                    );
                }
                tracing::info!("TASKS: Fetched {} tasks for {}", entry.tasks.len(), date_key);
                self.events.emit_tasks_published(date_key, &entry.tasks, true);

                Ok(TaskSnapshot {
                    tasks: entry.tasks,
                    fetched_at: entry.fetched_at,
                    fresh: true,
                })
            }
            Err(e) => match cached {
                Some(entry) => {
                    tracing::warn!(
                        "TASKS: Fetch failed for {} ({}), serving snapshot from {}",
                        date_key,
                        e,
                        entry.fetched_at
                    );
                    Ok(TaskSnapshot {
                        tasks: entry.tasks,
                        fetched_at: entry.fetched_at,
                        fresh: false,
                    })
                }
                None => {
                    tracing::error!(
                        "TASKS: Fetch failed for {} with no cached fallback: {}",
                        date_key,
                        e
                    );
                    Err(e)
                }
            },
        }
    }
}
