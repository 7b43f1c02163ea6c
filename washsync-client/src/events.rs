use std::sync::Mutex;

use chrono::NaiveDate;
use washsync_core::models::Task;
use washsync_core::{SyncError, SyncResult};

/// Events surfaced to the embedding UI.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// A task list became available for display. `fresh` is false when the
    /// list came from the cache and a fetch may still follow.
    TasksPublished {
        date_key: NaiveDate,
        tasks: Vec<Task>,
        fresh: bool,
    },
    /// A queue drain began.
    SyncStarted,
    /// A completion could not be delivered and was stored for later.
    CompletionQueued { schedule_id: String },
    /// The backend accepted a completion.
    CompletionSynced { schedule_id: String },
    /// A queue drain finished; `synced_count` records were delivered.
    SyncCompleted { synced_count: u64 },
    /// A record failed to sync and stays queued.
    SyncError { message: String },
    ReminderArmed { schedule_id: String },
    ReminderStopped { schedule_id: String },
    ConnectivityChanged { online: bool },
}

type EventCallback = Box<dyn Fn(&TaskEvent) + Send + Sync>;

/// Callback registry for UI integration. Callbacks run inline on the
/// emitting task and should hand work off rather than block.
pub struct EventDispatcher {
    callbacks: Mutex<Vec<EventCallback>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback invoked on every emitted event.
    pub fn register_callback<F>(&self, callback: F) -> SyncResult<()>
    where
        F: Fn(&TaskEvent) + Send + Sync + 'static,
    {
        let mut callbacks = self
            .callbacks
            .lock()
            .map_err(|e| SyncError::Lock(format!("callback registry: {}", e)))?;
        callbacks.push(Box::new(callback));

        tracing::debug!("EVENTS: Registered callback ({} total)", callbacks.len());
        Ok(())
    }

    /// Emission never fails; a poisoned registry is logged and skipped.
    fn emit(&self, event: TaskEvent) {
        let callbacks = match self.callbacks.lock() {
            Ok(callbacks) => callbacks,
            Err(e) => {
                tracing::error!("EVENTS: Callback registry poisoned, dropping event: {}", e);
                return;
            }
        };

        for callback in callbacks.iter() {
            callback(&event);
        }
    }

    pub fn emit_tasks_published(&self, date_key: NaiveDate, tasks: &[Task], fresh: bool) {
        self.emit(TaskEvent::TasksPublished {
            date_key,
            tasks: tasks.to_vec(),
            fresh,
        });
    }

    pub fn emit_sync_started(&self) {
        self.emit(TaskEvent::SyncStarted);
    }

    pub fn emit_completion_queued(&self, schedule_id: &str) {
        self.emit(TaskEvent::CompletionQueued {
            schedule_id: schedule_id.to_string(),
        });
    }

    pub fn emit_completion_synced(&self, schedule_id: &str) {
        self.emit(TaskEvent::CompletionSynced {
            schedule_id: schedule_id.to_string(),
        });
    }

    pub fn emit_sync_completed(&self, synced_count: u64) {
        self.emit(TaskEvent::SyncCompleted { synced_count });
    }

    pub fn emit_sync_error(&self, message: &str) {
        self.emit(TaskEvent::SyncError {
            message: message.to_string(),
        });
    }

    pub fn emit_reminder_armed(&self, schedule_id: &str) {
        self.emit(TaskEvent::ReminderArmed {
            schedule_id: schedule_id.to_string(),
        });
    }

    pub fn emit_reminder_stopped(&self, schedule_id: &str) {
        self.emit(TaskEvent::ReminderStopped {
            schedule_id: schedule_id.to_string(),
        });
    }

    pub fn emit_connectivity_changed(&self, online: bool) {
        self.emit(TaskEvent::ConnectivityChanged { online });
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
