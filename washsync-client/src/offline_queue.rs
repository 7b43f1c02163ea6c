use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;
use washsync_core::models::PendingCompletion;
use washsync_core::SyncResult;

use crate::store::DurableStore;

const QUEUE_KEY: &str = "pending_completions";

/// Durable, ordered queue of completion records awaiting delivery. The whole
/// list is stored as one JSON array and read-modify-written on every
/// mutation; `write_lock` keeps tasks within this process from interleaving
/// those cycles. Nothing guards against a second writing process.
pub struct OfflineQueue {
    store: Arc<dyn DurableStore>,
    write_lock: Mutex<()>,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// All queued records in insertion order.
    pub async fn list_all(&self) -> SyncResult<Vec<PendingCompletion>> {
        match self.store.get(QUEUE_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_all(&self, records: &[PendingCompletion]) -> SyncResult<()> {
        let raw = serde_json::to_string(records)?;
        self.store.set(QUEUE_KEY, &raw).await
    }

    /// Appends `record` at the tail.
    pub async fn enqueue(&self, record: PendingCompletion) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.list_all().await?;
        tracing::info!(
            "QUEUE: Enqueueing completion {} for task {} ({} already queued)",
            record.id,
            record.schedule_id,
            records.len()
        );
        records.push(record);
        self.write_all(&records).await
    }

    /// Drops the record with `id`, if present.
    pub async fn remove(&self, id: Uuid) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.list_all().await?;
        records.retain(|r| r.id != id);
        self.write_all(&records).await
    }

    /// Flags the record with `id` as accepted by the backend. The flag keeps
    /// a crash between backend acknowledgement and queue removal from
    /// causing a duplicate submission on the next drain.
    pub async fn mark_synced(&self, id: Uuid) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.list_all().await?;
        if let Some(record) = records.iter_mut().find(|r| r.id == id) {
            record.synced = true;
        }
        self.write_all(&records).await
    }

    /// Whether a record for `schedule_id` is already queued.
    pub async fn contains_schedule(&self, schedule_id: &str) -> SyncResult<bool> {
        let records = self.list_all().await?;
        Ok(records.iter().any(|r| r.schedule_id == schedule_id))
    }

    pub async fn len(&self) -> SyncResult<usize> {
        Ok(self.list_all().await?.len())
    }

    pub async fn is_empty(&self) -> SyncResult<bool> {
        Ok(self.len().await? == 0)
    }
}
