use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, Utc};
use tokio::sync::watch;
use washsync_client::cache::TaskCache;
use washsync_client::events::{EventDispatcher, TaskEvent};
use washsync_client::notifications::{NotificationId, Notifier, ScheduledNotification};
use washsync_client::offline_queue::OfflineQueue;
use washsync_client::reminders::ReminderScheduler;
use washsync_client::store::{DurableStore, SqliteStore};
use washsync_client::sync::SyncCoordinator;
use washsync_client::{ClientConfig, TaskBackend, WashClient};
use washsync_core::models::{CompletedByType, ReminderPayload, Task, TaskStatus, VehicleInfo};
use washsync_core::{SyncError, SyncResult};

/// Scriptable backend double recording every call it receives.
pub struct MockBackend {
    pub tasks: Mutex<HashMap<NaiveDate, Vec<Task>>>,
    pub fail_fetch: AtomicBool,
    pub fail_uploads: AtomicBool,
    pub fail_commits: Mutex<HashSet<String>>,
    pub upload_delay: Mutex<Option<Duration>>,
    pub upload_calls: Mutex<Vec<String>>,
    pub commit_calls: Mutex<Vec<String>>,
    pub delete_calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tasks: Mutex::new(HashMap::new()),
            fail_fetch: AtomicBool::new(false),
            fail_uploads: AtomicBool::new(false),
            fail_commits: Mutex::new(HashSet::new()),
            upload_delay: Mutex::new(None),
            upload_calls: Mutex::new(Vec::new()),
            commit_calls: Mutex::new(Vec::new()),
            delete_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn put_tasks(&self, date: NaiveDate, tasks: Vec<Task>) {
        self.tasks.lock().unwrap().insert(date, tasks);
    }

    pub fn fail_commit_for(&self, schedule_id: &str) {
        self.fail_commits.lock().unwrap().insert(schedule_id.to_string());
    }

    pub fn upload_count(&self) -> usize {
        self.upload_calls.lock().unwrap().len()
    }

    pub fn commit_count(&self) -> usize {
        self.commit_calls.lock().unwrap().len()
    }

    pub fn delete_count(&self) -> usize {
        self.delete_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TaskBackend for MockBackend {
    async fn fetch_tasks_for_date(&self, date: NaiveDate) -> SyncResult<Vec<Task>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SyncError::Backend("network unreachable".to_string()));
        }
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .get(&date)
            .cloned()
            .unwrap_or_default())
    }

    async fn upload_photo(&self, image_path: &str) -> SyncResult<String> {
        let delay = *self.upload_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.upload_calls.lock().unwrap().push(image_path.to_string());
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(SyncError::Backend("upload failed: connection reset".to_string()));
        }
        Ok(format!("https://cdn.example.com{}", image_path))
    }

    async fn commit_completion(
        &self,
        schedule_id: &str,
        _image_url: &str,
        _notes: Option<&str>,
    ) -> SyncResult<()> {
        self.commit_calls.lock().unwrap().push(schedule_id.to_string());
        if self.fail_commits.lock().unwrap().contains(schedule_id) {
            return Err(SyncError::Backend(format!("commit rejected for {}", schedule_id)));
        }
        Ok(())
    }

    async fn delete_upload(&self, image_url: &str) -> SyncResult<()> {
        self.delete_calls.lock().unwrap().push(image_url.to_string());
        Ok(())
    }
}

/// Notifier double keeping a live schedule the way a host platform would.
pub struct MockNotifier {
    pub scheduled: Mutex<Vec<ScheduledNotification>>,
    pub cancelled: Mutex<Vec<NotificationId>>,
    pub deny_permission: AtomicBool,
    pub schedule_delay: Mutex<Option<Duration>>,
    pub schedule_calls: AtomicUsize,
    next_id: AtomicUsize,
}

#[allow(dead_code)]
impl MockNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scheduled: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            deny_permission: AtomicBool::new(false),
            schedule_delay: Mutex::new(None),
            schedule_calls: AtomicUsize::new(0),
            next_id: AtomicUsize::new(0),
        })
    }

    /// Plants a tagged reminder notification, as left behind by an earlier
    /// app run.
    pub fn seed_reminder(&self, schedule_id: &str, date: NaiveDate) -> NotificationId {
        let payload = ReminderPayload::wash_reminder(schedule_id, make_vehicle(), date);
        let id = format!("seed-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.scheduled.lock().unwrap().push(ScheduledNotification {
            id: id.clone(),
            payload: serde_json::to_value(&payload).unwrap(),
        });
        id
    }

    /// Plants a notification belonging to some other subsystem.
    pub fn seed_foreign(&self, kind: &str) -> NotificationId {
        let id = format!("foreign-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.scheduled.lock().unwrap().push(ScheduledNotification {
            id: id.clone(),
            payload: serde_json::json!({ "type": kind, "body": "not ours" }),
        });
        id
    }

    /// Live notifications currently tagged with `schedule_id`.
    pub fn live_for(&self, schedule_id: &str) -> usize {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .filter(|n| {
                n.reminder_payload()
                    .map(|p| p.schedule_id() == schedule_id)
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn live_count(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }

    pub fn calls(&self) -> usize {
        self.schedule_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn schedule(
        &self,
        payload: &ReminderPayload,
        _delay: Duration,
    ) -> Result<NotificationId, washsync_core::errors::NotifyError> {
        let delay = *self.schedule_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.schedule_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_permission.load(Ordering::SeqCst) {
            return Err(washsync_core::errors::NotifyError::PermissionDenied);
        }
        let id = format!("n-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.scheduled.lock().unwrap().push(ScheduledNotification {
            id: id.clone(),
            payload: serde_json::to_value(payload)
                .map_err(|e| washsync_core::errors::NotifyError::Host(e.to_string()))?,
        });
        Ok(id)
    }

    async fn cancel(
        &self,
        ids: &[NotificationId],
    ) -> Result<(), washsync_core::errors::NotifyError> {
        let mut scheduled = self.scheduled.lock().unwrap();
        scheduled.retain(|n| !ids.contains(&n.id));
        self.cancelled.lock().unwrap().extend(ids.iter().cloned());
        Ok(())
    }

    async fn list_scheduled(
        &self,
    ) -> Result<Vec<ScheduledNotification>, washsync_core::errors::NotifyError> {
        Ok(self.scheduled.lock().unwrap().clone())
    }
}

/// The component stack wired over an in-memory store, for tests that drive
/// individual components instead of the full client.
pub struct TestStack {
    pub store: Arc<SqliteStore>,
    pub cache: Arc<TaskCache>,
    pub queue: Arc<OfflineQueue>,
    pub events: Arc<EventDispatcher>,
    pub scheduler: Arc<ReminderScheduler>,
    pub coordinator: Arc<SyncCoordinator>,
}

#[allow(dead_code)]
pub async fn build_stack(
    backend: Arc<MockBackend>,
    notifier: Arc<MockNotifier>,
    reminder_interval: Duration,
) -> TestStack {
    let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
    store.run_migrations().await.unwrap();

    let store_dyn: Arc<dyn DurableStore> = store.clone();
    let cache = Arc::new(TaskCache::new(store_dyn.clone()));
    let queue = Arc::new(OfflineQueue::new(store_dyn.clone()));
    let events = Arc::new(EventDispatcher::new());
    let scheduler = Arc::new(ReminderScheduler::new(
        notifier,
        cache.clone(),
        events.clone(),
        reminder_interval,
    ));
    let coordinator = Arc::new(SyncCoordinator::new(
        store_dyn,
        queue.clone(),
        cache.clone(),
        backend,
        scheduler.clone(),
        events.clone(),
    ));

    TestStack {
        store,
        cache,
        queue,
        events,
        scheduler,
        coordinator,
    }
}

/// Creates a full client over an in-memory store. The returned sender feeds
/// the connectivity signal; it starts offline.
#[allow(dead_code)]
pub async fn setup_client(
    backend: Arc<MockBackend>,
    notifier: Arc<MockNotifier>,
) -> (WashClient, watch::Sender<bool>) {
    let (tx, rx) = watch::channel(false);
    let config = ClientConfig {
        database_url: "sqlite::memory:".to_string(),
        reminder_interval: Duration::from_millis(50),
    };
    let client = WashClient::new(config, backend, notifier, rx).await.unwrap();
    (client, tx)
}

/// Creates a full client over a file-backed store, for restart tests.
#[allow(dead_code)]
pub async fn setup_client_at(
    database_url: &str,
    initially_online: bool,
    backend: Arc<MockBackend>,
    notifier: Arc<MockNotifier>,
) -> (WashClient, watch::Sender<bool>) {
    let (tx, rx) = watch::channel(initially_online);
    let config = ClientConfig {
        database_url: database_url.to_string(),
        reminder_interval: Duration::from_secs(600),
    };
    let client = WashClient::new(config, backend, notifier, rx).await.unwrap();
    (client, tx)
}

/// Records every emitted event for later assertions.
#[allow(dead_code)]
pub fn record_events(events: &EventDispatcher) -> Arc<Mutex<Vec<TaskEvent>>> {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();
    events
        .register_callback(move |event| sink.lock().unwrap().push(event.clone()))
        .unwrap();
    recorded
}

/// Creates a sample wash task for a given date.
#[allow(dead_code)]
pub fn make_task(id: &str, date: NaiveDate, status: TaskStatus) -> Task {
    let completed = status == TaskStatus::Completed;
    Task {
        id: id.to_string(),
        vehicle_id: format!("veh-{}", id),
        scheduled_date: date,
        status,
        completed_at: completed.then(Utc::now),
        completed_by_type: completed.then_some(CompletedByType::Admin),
        image_url: completed.then(|| format!("https://cdn.example.com/{}.jpg", id)),
        notes: None,
        vehicle_info: Some(make_vehicle()),
    }
}

#[allow(dead_code)]
pub fn make_vehicle() -> VehicleInfo {
    VehicleInfo {
        license_plate: "AB-123-CD".to_string(),
        brand: "Renault".to_string(),
        model: "Master".to_string(),
    }
}

/// The device-local date tasks are scheduled against.
#[allow(dead_code)]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
