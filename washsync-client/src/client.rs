use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::sync::{watch, Mutex};
use washsync_core::models::{TaskStatus, VehicleInfo};
use washsync_core::{SyncError, SyncResult};

use crate::backend::TaskBackend;
use crate::cache::TaskCache;
use crate::connectivity::ConnectivityMonitor;
use crate::events::{EventDispatcher, TaskEvent};
use crate::notifications::Notifier;
use crate::offline_queue::OfflineQueue;
use crate::reminders::ReminderScheduler;
use crate::store::{DurableStore, SqliteStore};
use crate::sync::{CompletionOutcome, DrainOutcome, SyncCoordinator};
use crate::tasks::{TaskReader, TaskSnapshot};

/// Construction parameters for [`WashClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SQLite URL for the durable store. `sqlite::memory:` works for tests.
    pub database_url: String,
    /// Period between reminder emissions for one armed task.
    pub reminder_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:washsync.db?mode=rwc".to_string(),
            reminder_interval: Duration::from_secs(30 * 60),
        }
    }
}

/// The embedding app's single entry point: owns the store, cache, queue,
/// reminder scheduler, sync coordinator, and connectivity monitor, and wires
/// them together.
pub struct WashClient {
    store: Arc<SqliteStore>,
    cache: Arc<TaskCache>,
    queue: Arc<OfflineQueue>,
    events: Arc<EventDispatcher>,
    scheduler: Arc<ReminderScheduler>,
    coordinator: Arc<SyncCoordinator>,
    reader: TaskReader,
    monitor: ConnectivityMonitor,
    /// Taken by [`Self::init`]; `Some` means init has not run yet.
    connectivity_rx: Mutex<Option<watch::Receiver<bool>>>,
}

impl WashClient {
    /// Connects the store, runs migrations, and wires every component.
    /// Call [`Self::init`] afterwards to reconcile persisted state and
    /// start watching connectivity.
    pub async fn new(
        config: ClientConfig,
        backend: Arc<dyn TaskBackend>,
        notifier: Arc<dyn Notifier>,
        connectivity_rx: watch::Receiver<bool>,
    ) -> SyncResult<Self> {
        let store = Arc::new(SqliteStore::new(&config.database_url).await?);
        store.run_migrations().await?;

        let store_dyn: Arc<dyn DurableStore> = store.clone();
        let cache = Arc::new(TaskCache::new(store_dyn.clone()));
        let queue = Arc::new(OfflineQueue::new(store_dyn.clone()));
        let events = Arc::new(EventDispatcher::new());
        let scheduler = Arc::new(ReminderScheduler::new(
            notifier,
            cache.clone(),
            events.clone(),
            config.reminder_interval,
        ));
        let coordinator = Arc::new(SyncCoordinator::new(
            store_dyn,
            queue.clone(),
            cache.clone(),
            backend.clone(),
            scheduler.clone(),
            events.clone(),
        ));
        let reader = TaskReader::new(cache.clone(), backend, events.clone());
        let monitor = ConnectivityMonitor::new(queue.clone());

        tracing::info!("CLIENT: 🚀 Wired against {}", config.database_url);

        Ok(Self {
            store,
            cache,
            queue,
            events,
            scheduler,
            coordinator,
            reader,
            monitor,
            connectivity_rx: Mutex::new(Some(connectivity_rx)),
        })
    }

    /// Brings the client to its running state: re-arms reminders for every
    /// pending task in the latest cached snapshot for today, cancels host
    /// notifications orphaned by a previous run, starts the connectivity
    /// monitor, and drains the queue if the signal already reads online.
    pub async fn init(&self) -> SyncResult<()> {
        let rx = self
            .connectivity_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| SyncError::InvalidState("client already initialized".to_string()))?;

        let today = Local::now().date_naive();
        let mut pending_ids = Vec::new();
        match self.cache.get(today).await {
            Ok(Some(entry)) => {
                for task in entry.tasks.iter().filter(|t| t.status == TaskStatus::Pending) {
                    let vehicle_info = task.vehicle_info.clone().unwrap_or_default();
                    self.scheduler
                        .start(&task.id, vehicle_info, task.scheduled_date)
                        .await;
                    pending_ids.push(task.id.clone());
                }
                tracing::info!(
                    "CLIENT: Re-armed {} reminders from cached snapshot for {}",
                    pending_ids.len(),
                    today
                );
            }
            Ok(None) => {
                tracing::debug!("CLIENT: No cached snapshot for {}, nothing to re-arm", today);
            }
            Err(e) => {
                tracing::warn!("CLIENT: Could not read cached snapshot for {}: {}", today, e);
            }
        }

        let orphans = self.scheduler.reconcile(&pending_ids).await;
        if orphans > 0 {
            tracing::info!(
                "CLIENT: Startup reconciliation cancelled {} orphaned notifications",
                orphans
            );
        }

        self.monitor
            .start(rx, self.coordinator.clone(), self.events.clone())
            .await;

        // Starting online is not an edge, so the monitor will not fire;
        // anything queued from the previous session drains here instead.
        if self.monitor.is_online() && !self.queue.is_empty().await? {
            tracing::info!("CLIENT: Online with queued completions, draining");
            match self.coordinator.drain().await {
                Ok(outcome) => tracing::debug!("CLIENT: Startup drain: {:?}", outcome),
                Err(e) => tracing::warn!("CLIENT: Startup drain failed: {}", e),
            }
        }

        Ok(())
    }

    /// Stale-while-revalidate read for one date. A cached list is published
    /// to callbacks immediately; the returned snapshot is the freshest one
    /// available.
    pub async fn tasks_for_date(&self, date_key: NaiveDate) -> SyncResult<TaskSnapshot> {
        self.reader.get(date_key).await
    }

    /// Records a wash completion (photo plus optional notes) for the task's
    /// scheduled date. Succeeds even with no network: the record is queued
    /// and delivered by a later drain.
    pub async fn complete_task(
        &self,
        schedule_id: &str,
        scheduled_date: NaiveDate,
        image_path: &str,
        notes: Option<String>,
    ) -> SyncResult<CompletionOutcome> {
        self.coordinator
            .complete_task(schedule_id, scheduled_date, image_path, notes)
            .await
    }

    /// Manual drain trigger, for a retry button or pull-to-refresh.
    pub async fn retry_sync(&self) -> SyncResult<DrainOutcome> {
        self.coordinator.drain().await
    }

    /// Arms (or idempotently re-arms) the recurring reminder for one task.
    pub async fn arm_reminder(
        &self,
        schedule_id: &str,
        vehicle_info: VehicleInfo,
        scheduled_date: NaiveDate,
    ) {
        self.scheduler
            .start(schedule_id, vehicle_info, scheduled_date)
            .await;
    }

    /// Stops the reminder timer for one task and cancels its notifications.
    pub async fn stop_reminders(&self, schedule_id: &str) {
        self.scheduler.stop(schedule_id).await;
    }

    /// Session teardown, e.g. on logout: every timer and every tagged host
    /// notification goes.
    pub async fn stop_all_reminders(&self) {
        self.scheduler.stop_all().await;
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Whether completions are waiting on a drain.
    pub async fn has_pending_work(&self) -> SyncResult<bool> {
        self.monitor.has_pending_work().await
    }

    /// When a drain last delivered something, if ever.
    pub async fn last_sync_at(&self) -> SyncResult<Option<DateTime<Utc>>> {
        self.coordinator.last_sync_at().await
    }

    /// Register a callback invoked on every [`TaskEvent`].
    pub fn register_callback<F>(&self, callback: F) -> SyncResult<()>
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        self.events.register_callback(callback)
    }

    pub fn events(&self) -> Arc<EventDispatcher> {
        self.events.clone()
    }

    /// Stops background work and closes the store. Host notifications
    /// already scheduled keep their delivery; stopping delivery too is what
    /// [`Self::stop_all_reminders`] is for. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        self.monitor.shutdown().await;
        self.store.close().await;
        tracing::info!("CLIENT: Shut down");
    }
}
