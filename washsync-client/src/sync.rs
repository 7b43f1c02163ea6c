use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use washsync_core::models::{CompletedByType, PendingCompletion};
use washsync_core::{SyncError, SyncResult};

use crate::backend::TaskBackend;
use crate::cache::TaskCache;
use crate::events::EventDispatcher;
use crate::offline_queue::OfflineQueue;
use crate::reminders::ReminderScheduler;
use crate::store::DurableStore;

const LAST_SYNC_KEY: &str = "last_sync_at";

/// What a drain attempt resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue was walked; counts of delivered and still-queued records.
    Drained { synced: usize, failed: usize },
    /// Another drain was in flight. This trigger was dropped, not queued;
    /// the next connectivity edge or manual retry drains what remains.
    AlreadyRunning,
}

/// What recording a completion resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The backend accepted the completion immediately.
    Synced,
    /// The record is queued for a later drain; the UI should show it as
    /// pending sync.
    Queued,
}

/// Owns the two submission flows, immediate and queued, and converges them
/// on one submit path: upload the photo, then commit the completion record,
/// rolling the upload back when the commit fails.
pub struct SyncCoordinator {
    store: Arc<dyn DurableStore>,
    queue: Arc<OfflineQueue>,
    cache: Arc<TaskCache>,
    backend: Arc<dyn TaskBackend>,
    scheduler: Arc<ReminderScheduler>,
    events: Arc<EventDispatcher>,
    /// Drain guard. A `try_lock` failure means a drain is in flight; the
    /// new trigger is dropped rather than queued.
    draining: Mutex<()>,
    /// Serializes foreground completions: the duplicate checks and the
    /// enqueue of one call must not interleave with another's.
    completing: Mutex<()>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn DurableStore>,
        queue: Arc<OfflineQueue>,
        cache: Arc<TaskCache>,
        backend: Arc<dyn TaskBackend>,
        scheduler: Arc<ReminderScheduler>,
        events: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            store,
            queue,
            cache,
            backend,
            scheduler,
            events,
            draining: Mutex::new(()),
            completing: Mutex::new(()),
        }
    }

    /// Foreground completion entry point. Never fails for lack of network:
    /// a record that cannot be delivered right now is queued and the call
    /// still succeeds.
    pub async fn complete_task(
        &self,
        schedule_id: &str,
        scheduled_date: NaiveDate,
        image_path: &str,
        notes: Option<String>,
    ) -> SyncResult<CompletionOutcome> {
        let _guard = self.completing.lock().await;

        self.ensure_not_completed(schedule_id, scheduled_date).await?;

        // A queued record already covers this task; completing twice while
        // offline must not produce a duplicate submission.
        if self.queue.contains_schedule(schedule_id).await? {
            tracing::info!(
                "SYNC: Completion for task {} already queued, nothing to do",
                schedule_id
            );
            return Ok(CompletionOutcome::Queued);
        }

        let record = PendingCompletion::new(schedule_id, scheduled_date, image_path, notes);
        match self.submit_record(&record).await {
            Ok(image_url) => {
                tracing::info!("SYNC: ✅ Immediate submit succeeded for task {}", schedule_id);
                self.finalize_success(&record, &image_url).await;
                Ok(CompletionOutcome::Synced)
            }
            Err(e) => {
                tracing::warn!(
                    "SYNC: 📴 Immediate submit failed for task {} ({}), queueing for retry",
                    schedule_id,
                    e
                );
                self.queue.enqueue(record).await?;
                self.events.emit_completion_queued(schedule_id);
                Ok(CompletionOutcome::Queued)
            }
        }
    }

    /// Walks the queue in insertion order, delivering each record
    /// independently: one failing record stays queued and the walk moves on.
    pub async fn drain(&self) -> SyncResult<DrainOutcome> {
        let _guard = match self.draining.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::info!("SYNC: Drain already in flight, dropping trigger");
                return Ok(DrainOutcome::AlreadyRunning);
            }
        };

        let records = self.queue.list_all().await?;
        if records.is_empty() {
            tracing::debug!("SYNC: Queue empty, nothing to drain");
            return Ok(DrainOutcome::Drained {
                synced: 0,
                failed: 0,
            });
        }

        tracing::info!("SYNC: 📤 Draining {} queued completions", records.len());
        self.events.emit_sync_started();

        let mut synced = 0;
        let mut failed = 0;
        for record in records {
            if record.synced {
                // Accepted by the backend on a run that died before the
                // removal; finish the removal without resubmitting.
                match self.queue.remove(record.id).await {
                    Ok(()) => synced += 1,
                    Err(e) => {
                        tracing::error!(
                            "SYNC: Failed to remove confirmed record {}: {}",
                            record.id,
                            e
                        );
                        failed += 1;
                    }
                }
                continue;
            }

            match self.submit_record(&record).await {
                Ok(image_url) => {
                    if let Err(e) = self.queue.mark_synced(record.id).await {
                        tracing::error!(
                            "SYNC: Failed to flag record {} as synced: {}",
                            record.id,
                            e
                        );
                    }
                    match self.queue.remove(record.id).await {
                        Ok(()) => {
                            self.finalize_success(&record, &image_url).await;
                            synced += 1;
                        }
                        Err(e) => {
                            tracing::error!(
                                "SYNC: Failed to remove record {} after submit: {}",
                                record.id,
                                e
                            );
                            failed += 1;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "SYNC: Submission failed for task {} ({}), leaving record queued",
                        record.schedule_id,
                        e
                    );
                    self.events.emit_sync_error(&format!(
                        "Completion for {} not delivered: {}",
                        record.schedule_id, e
                    ));
                    failed += 1;
                }
            }
        }

        if synced > 0 {
            if let Err(e) = self.store.set(LAST_SYNC_KEY, &Utc::now().to_rfc3339()).await {
                tracing::error!("SYNC: Failed to write last-sync marker: {}", e);
            }
        }
        self.events.emit_sync_completed(synced as u64);

        tracing::info!(
            "SYNC: Drain complete ({} delivered, {} still queued)",
            synced,
            failed
        );
        Ok(DrainOutcome::Drained { synced, failed })
    }

    /// When a drain last delivered something, if ever.
    pub async fn last_sync_at(&self) -> SyncResult<Option<DateTime<Utc>>> {
        match self.store.get(LAST_SYNC_KEY).await? {
            Some(raw) => Ok(Some(DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc))),
            None => Ok(None),
        }
    }

    /// Completion is terminal; a task whose own date's snapshot already
    /// shows it completed must be rejected before any upload happens.
    async fn ensure_not_completed(
        &self,
        schedule_id: &str,
        scheduled_date: NaiveDate,
    ) -> SyncResult<()> {
        if let Some(entry) = self.cache.get(scheduled_date).await? {
            if let Some(task) = entry.find_task(schedule_id) {
                if task.is_completed() {
                    return Err(SyncError::AlreadyCompleted(schedule_id.to_string()));
                }
            }
        }
        Ok(())
    }

    /// The single submit path both flows use: upload, then commit against
    /// the uploaded URL. A failed commit deletes the upload so object
    /// storage does not accumulate orphaned photos.
    async fn submit_record(&self, record: &PendingCompletion) -> SyncResult<String> {
        let image_url = self.backend.upload_photo(&record.image_path).await?;

        match self
            .backend
            .commit_completion(&record.schedule_id, &image_url, record.notes.as_deref())
            .await
        {
            Ok(()) => Ok(image_url),
            Err(commit_err) => {
                tracing::warn!(
                    "SYNC: Commit failed after upload for task {}, rolling back {}",
                    record.schedule_id,
                    image_url
                );
                if let Err(delete_err) = self.backend.delete_upload(&image_url).await {
                    // Accepted leak: logged, never retried.
                    tracing::error!(
                        "SYNC: Rollback delete failed for {}: {}",
                        image_url,
                        delete_err
                    );
                }
                Err(commit_err)
            }
        }
    }

    /// Post-acceptance bookkeeping shared by both flows: stop the task's
    /// reminders and flip it to completed in the cached snapshot. Local
    /// failures here are logged only; the backend already has the
    /// completion.
    async fn finalize_success(&self, record: &PendingCompletion, image_url: &str) {
        self.scheduler.stop(&record.schedule_id).await;

        let marked = self
            .mark_completed_in(record.scheduled_date, record, image_url)
            .await;
        if !marked {
            tracing::debug!(
                "SYNC: Task {} not in the snapshot for {}, revalidation will pick it up",
                record.schedule_id,
                record.scheduled_date
            );
        }

        self.events.emit_completion_synced(&record.schedule_id);
    }

    async fn mark_completed_in(
        &self,
        date_key: NaiveDate,
        record: &PendingCompletion,
        image_url: &str,
    ) -> bool {
        let result = self
            .cache
            .mark_task_completed(
                date_key,
                &record.schedule_id,
                CompletedByType::Driver,
                record.captured_at,
                Some(image_url.to_string()),
                record.notes.clone(),
            )
            .await;
        match result {
            Ok(marked) => marked,
            Err(e) => {
                tracing::warn!(
                    "SYNC: Cache rewrite failed for task {}: {}",
                    record.schedule_id,
                    e
                );
                false
            }
        }
    }
}
