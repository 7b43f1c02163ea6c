use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use washsync_core::errors::NotifyError;
use washsync_core::models::{ReminderPayload, TaskStatus, VehicleInfo};

use crate::cache::TaskCache;
use crate::events::EventDispatcher;
use crate::notifications::{NotificationId, Notifier};

/// In-memory registration for one armed reminder: the recurring timer plus
/// every host notification id issued under the schedule's tag. Handles are
/// not persisted; startup rebuilds them from the latest cached task list.
struct ReminderHandle {
    timer: JoinHandle<()>,
    notification_ids: Vec<NotificationId>,
}

/// Keeps drivers aware of unwashed vehicles: one notification when a task's
/// reminder is armed, then another every interval until the task completes
/// or the reminder is stopped. Scheduling failures degrade to log lines and
/// never fail the surrounding operation.
pub struct ReminderScheduler {
    notifier: Arc<dyn Notifier>,
    cache: Arc<TaskCache>,
    events: Arc<EventDispatcher>,
    interval: Duration,
    handles: Arc<Mutex<HashMap<String, ReminderHandle>>>,
}

impl ReminderScheduler {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        cache: Arc<TaskCache>,
        events: Arc<EventDispatcher>,
        interval: Duration,
    ) -> Self {
        Self {
            notifier,
            cache,
            events,
            interval,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Arms the reminder for one task: an immediate notification, then a
    /// recurring timer. Re-arming an already armed task tears the previous
    /// registration down first, so there is never more than one timer per
    /// task.
    pub async fn start(
        &self,
        schedule_id: &str,
        vehicle_info: VehicleInfo,
        scheduled_date: NaiveDate,
    ) {
        self.cancel_handle(schedule_id).await;

        let payload = ReminderPayload::wash_reminder(schedule_id, vehicle_info, scheduled_date);

        let mut notification_ids = Vec::new();
        match self.notifier.schedule(&payload, Duration::ZERO).await {
            Ok(id) => {
                tracing::info!("REMINDER: 🔔 Emitted reminder for task {}", schedule_id);
                notification_ids.push(id);
            }
            Err(NotifyError::PermissionDenied) => {
                tracing::warn!(
                    "REMINDER: Notifications denied, arming {} without delivery",
                    schedule_id
                );
            }
            Err(e) => {
                tracing::warn!("REMINDER: Failed to emit reminder for {}: {}", schedule_id, e);
            }
        }

        let timer = self.spawn_timer(schedule_id.to_string(), payload);

        let displaced = self.handles.lock().await.insert(
            schedule_id.to_string(),
            ReminderHandle {
                timer,
                notification_ids,
            },
        );
        // A concurrent arm for the same id can get past cancel_handle while
        // this call was parked in the notifier; the losing registration
        // surfaces here and is torn down like any replaced handle.
        if let Some(old) = displaced {
            old.timer.abort();
            if !old.notification_ids.is_empty() {
                if let Err(e) = self.notifier.cancel(&old.notification_ids).await {
                    tracing::warn!(
                        "REMINDER: Failed to cancel notifications displaced by re-arm for {}: {}",
                        schedule_id,
                        e
                    );
                }
            }
        }

        self.events.emit_reminder_armed(schedule_id);
    }

    fn spawn_timer(&self, schedule_id: String, payload: ReminderPayload) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        let cache = self.cache.clone();
        let events = self.events.clone();
        let handles = self.handles.clone();
        let period = self.interval;

        tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                // Re-check the latest snapshot before nagging: the task may
                // have been completed through another channel (an admin,
                // another device) since the last tick.
                match cache.task_status(payload.scheduled_date(), &schedule_id).await {
                    Ok(Some(TaskStatus::Completed)) => {
                        tracing::info!(
                            "REMINDER: Task {} completed out of band, disarming",
                            schedule_id
                        );
                        let removed = handles.lock().await.remove(&schedule_id);
                        if let Some(handle) = removed {
                            if let Err(e) = notifier.cancel(&handle.notification_ids).await {
                                tracing::warn!(
                                    "REMINDER: Failed to cancel notifications for {}: {}",
                                    schedule_id,
                                    e
                                );
                            }
                        }
                        events.emit_reminder_stopped(&schedule_id);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // Status unknown; emit anyway.
                        tracing::warn!(
                            "REMINDER: Status check failed for {}: {}",
                            schedule_id,
                            e
                        );
                    }
                }

                match notifier.schedule(&payload, Duration::ZERO).await {
                    Ok(id) => {
                        let mut handles_guard = handles.lock().await;
                        match handles_guard.get_mut(&schedule_id) {
                            Some(handle) => handle.notification_ids.push(id),
                            None => {
                                // Stopped between the tick and this point;
                                // take the stray notification down again.
                                drop(handles_guard);
                                if let Err(e) = notifier.cancel(&[id]).await {
                                    tracing::warn!(
                                        "REMINDER: Failed to cancel stray notification: {}",
                                        e
                                    );
                                }
                                break;
                            }
                        }
                    }
                    Err(NotifyError::PermissionDenied) => {
                        tracing::debug!(
                            "REMINDER: Notifications still denied for {}",
                            schedule_id
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            "REMINDER: Tick emit failed for {}: {}",
                            schedule_id,
                            e
                        );
                    }
                }
            }
        })
    }

    /// Removes the registration for `schedule_id` and tears it down: aborts
    /// the timer, cancels its notifications. Returns whether one existed.
    async fn cancel_handle(&self, schedule_id: &str) -> bool {
        let removed = self.handles.lock().await.remove(schedule_id);
        match removed {
            Some(handle) => {
                handle.timer.abort();
                if !handle.notification_ids.is_empty() {
                    if let Err(e) = self.notifier.cancel(&handle.notification_ids).await {
                        tracing::warn!(
                            "REMINDER: Failed to cancel notifications for {}: {}",
                            schedule_id,
                            e
                        );
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Stops the reminder for one task. Cancellation covers the timer AND
    /// every host notification issued under the id; safe to call when
    /// nothing is armed.
    pub async fn stop(&self, schedule_id: &str) {
        if self.cancel_handle(schedule_id).await {
            tracing::info!("REMINDER: Stopped reminders for task {}", schedule_id);
            self.events.emit_reminder_stopped(schedule_id);
        }
    }

    /// Session teardown: stops every tracked reminder, then sweeps the host
    /// schedule for anything carrying our payload tag, tracked or not.
    pub async fn stop_all(&self) {
        let drained: Vec<(String, ReminderHandle)> = {
            let mut handles = self.handles.lock().await;
            handles.drain().collect()
        };

        let mut all_ids = Vec::new();
        for (schedule_id, handle) in drained {
            handle.timer.abort();
            all_ids.extend(handle.notification_ids);
            self.events.emit_reminder_stopped(&schedule_id);
        }
        if !all_ids.is_empty() {
            if let Err(e) = self.notifier.cancel(&all_ids).await {
                tracing::warn!(
                    "REMINDER: Failed to cancel {} notifications: {}",
                    all_ids.len(),
                    e
                );
            }
        }

        match self.notifier.list_scheduled().await {
            Ok(scheduled) => {
                let stray: Vec<NotificationId> = scheduled
                    .iter()
                    .filter(|n| n.reminder_payload().is_some())
                    .map(|n| n.id.clone())
                    .collect();
                if !stray.is_empty() {
                    tracing::info!(
                        "REMINDER: Cancelling {} tagged notifications on teardown",
                        stray.len()
                    );
                    if let Err(e) = self.notifier.cancel(&stray).await {
                        tracing::warn!("REMINDER: Failed to cancel tagged notifications: {}", e);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("REMINDER: Could not list scheduled notifications: {}", e);
            }
        }
    }

    /// Startup repair: cancels tagged notifications whose schedule id is no
    /// longer pending, left behind by a previous run. Returns how many were
    /// cancelled. The full scan lives only here; steady-state cancellation
    /// goes through the per-task id index.
    pub async fn reconcile(&self, pending_ids: &[String]) -> usize {
        let scheduled = match self.notifier.list_scheduled().await {
            Ok(scheduled) => scheduled,
            Err(e) => {
                tracing::warn!("REMINDER: Reconcile scan failed: {}", e);
                return 0;
            }
        };

        let orphaned: Vec<NotificationId> = scheduled
            .iter()
            .filter_map(|n| n.reminder_payload().map(|p| (n.id.clone(), p)))
            .filter(|(_, payload)| !pending_ids.iter().any(|id| id == payload.schedule_id()))
            .map(|(id, _)| id)
            .collect();

        if orphaned.is_empty() {
            return 0;
        }

        tracing::info!(
            "REMINDER: Cancelling {} orphaned notifications from a previous run",
            orphaned.len()
        );
        match self.notifier.cancel(&orphaned).await {
            Ok(()) => orphaned.len(),
            Err(e) => {
                tracing::warn!("REMINDER: Failed to cancel orphaned notifications: {}", e);
                0
            }
        }
    }

    /// Whether a reminder is currently armed for `schedule_id`.
    pub async fn is_armed(&self, schedule_id: &str) -> bool {
        self.handles.lock().await.contains_key(schedule_id)
    }

    /// Number of armed reminders.
    pub async fn active_count(&self) -> usize {
        self.handles.lock().await.len()
    }

    /// Drops every timer without touching the host schedule. Notifications
    /// already handed to the host keep their delivery; this matches the
    /// state a process kill leaves behind.
    pub async fn shutdown(&self) {
        let mut handles = self.handles.lock().await;
        let count = handles.len();
        for (_, handle) in handles.drain() {
            handle.timer.abort();
        }
        if count > 0 {
            tracing::info!("REMINDER: Shut down {} reminder timers", count);
        }
    }
}
