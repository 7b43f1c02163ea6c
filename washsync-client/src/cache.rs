use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use washsync_core::models::{CacheEntry, CompletedByType, TaskStatus};
use washsync_core::SyncResult;

use crate::store::DurableStore;

const CACHE_KEY_PREFIX: &str = "task_cache:";

/// Read-side cache over the durable store: the last successfully fetched
/// task list for each date. Entries are replaced wholesale on every
/// successful fetch, never merged.
pub struct TaskCache {
    store: Arc<dyn DurableStore>,
}

impl TaskCache {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    fn key_for(date_key: NaiveDate) -> String {
        format!("{}{}", CACHE_KEY_PREFIX, date_key.format("%Y-%m-%d"))
    }

    /// Returns the cached entry for `date_key`, if one was ever stored.
    pub async fn get(&self, date_key: NaiveDate) -> SyncResult<Option<CacheEntry>> {
        match self.store.get(&Self::key_for(date_key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Replaces the entry for the entry's date wholesale.
    pub async fn put(&self, entry: &CacheEntry) -> SyncResult<()> {
        let raw = serde_json::to_string(entry)?;
        self.store.set(&Self::key_for(entry.date_key), &raw).await?;

        tracing::debug!(
            "CACHE: Stored {} tasks for {}",
            entry.tasks.len(),
            entry.date_key
        );
        Ok(())
    }

    /// Flips one task in the `date_key` entry to completed and rewrites the
    /// entry. Returns `false` when either the entry or the task is missing;
    /// the next revalidating fetch covers that case. The entry's
    /// `fetched_at` is left untouched; a local flip is not a fresh fetch.
    pub async fn mark_task_completed(
        &self,
        date_key: NaiveDate,
        schedule_id: &str,
        completed_by: CompletedByType,
        completed_at: DateTime<Utc>,
        image_url: Option<String>,
        notes: Option<String>,
    ) -> SyncResult<bool> {
        let mut entry = match self.get(date_key).await? {
            Some(entry) => entry,
            None => return Ok(false),
        };

        let task = match entry.tasks.iter_mut().find(|t| t.id == schedule_id) {
            Some(task) => task,
            None => return Ok(false),
        };

        if task.is_completed() {
            return Ok(true);
        }

        task.mark_completed(completed_by, completed_at, image_url, notes);
        self.put(&entry).await?;

        tracing::info!("CACHE: Marked task {} completed in {}", schedule_id, date_key);
        Ok(true)
    }

    /// Latest cached status for one task, used by reminder re-validation.
    pub async fn task_status(
        &self,
        date_key: NaiveDate,
        schedule_id: &str,
    ) -> SyncResult<Option<TaskStatus>> {
        let entry = self.get(date_key).await?;
        Ok(entry.and_then(|e| e.find_task(schedule_id).map(|t| t.status)))
    }
}
