use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CompletedByType {
    Driver,
    Admin,
}

/// Denormalized vehicle identity carried in reminder payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VehicleInfo {
    pub license_plate: String,
    pub brand: String,
    pub model: String,
}

/// A schedulable vehicle-wash task. Created server-side; this subsystem only
/// reads it and transitions it to `Completed` after a confirmed submit.
/// `Completed` is terminal: `completed_at` is always set with it and nothing
/// here transitions a task back to `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub vehicle_id: String,
    pub scheduled_date: NaiveDate,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by_type: Option<CompletedByType>,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    /// Present when the backend denormalizes vehicle data onto the task;
    /// feeds the reminder payload and startup re-arm.
    #[serde(default)]
    pub vehicle_info: Option<VehicleInfo>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// One-way transition to `Completed`. Sets the fields that state
    /// requires; keeps existing image/notes when the caller has none.
    pub fn mark_completed(
        &mut self,
        by: CompletedByType,
        completed_at: DateTime<Utc>,
        image_url: Option<String>,
        notes: Option<String>,
    ) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(completed_at);
        self.completed_by_type = Some(by);
        if image_url.is_some() {
            self.image_url = image_url;
        }
        if notes.is_some() {
            self.notes = notes;
        }
    }
}

/// A durable record of a not-yet-confirmed completion. Lives in the offline
/// queue until the backend accepts the submission, then is removed. The only
/// in-place mutation allowed is the `synced` flag, set between backend
/// acceptance and removal so a crash in that window cannot cause a resubmit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingCompletion {
    pub id: Uuid,
    pub schedule_id: String,
    /// The task's own calendar date. Confirmation bookkeeping addresses the
    /// cache entry for this date, not for whatever day the drain runs on.
    pub scheduled_date: NaiveDate,
    pub image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub synced: bool,
}

impl PendingCompletion {
    pub fn new(
        schedule_id: impl Into<String>,
        scheduled_date: NaiveDate,
        image_path: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            schedule_id: schedule_id.into(),
            scheduled_date,
            image_path: image_path.into(),
            notes,
            captured_at: Utc::now(),
            synced: false,
        }
    }
}

/// Persisted read-side cache: the last fetched task list for one date key.
/// At most one entry per date; entries are replaced wholesale, never merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub date_key: NaiveDate,
    pub tasks: Vec<Task>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(date_key: NaiveDate, tasks: Vec<Task>) -> Self {
        Self {
            date_key,
            tasks,
            fetched_at: Utc::now(),
        }
    }

    pub fn find_task(&self, schedule_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == schedule_id)
    }
}

/// Host-notification payload, tagged so scheduled notifications can later be
/// cancelled or filtered by type and schedule id. Closed enum: anything whose
/// `type` tag is unknown fails deserialization instead of passing through as
/// an untyped map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReminderPayload {
    WashReminder {
        schedule_id: String,
        vehicle_info: VehicleInfo,
        scheduled_date: NaiveDate,
    },
}

impl ReminderPayload {
    pub fn wash_reminder(
        schedule_id: impl Into<String>,
        vehicle_info: VehicleInfo,
        scheduled_date: NaiveDate,
    ) -> Self {
        ReminderPayload::WashReminder {
            schedule_id: schedule_id.into(),
            vehicle_info,
            scheduled_date,
        }
    }

    pub fn schedule_id(&self) -> &str {
        match self {
            ReminderPayload::WashReminder { schedule_id, .. } => schedule_id,
        }
    }

    pub fn scheduled_date(&self) -> NaiveDate {
        match self {
            ReminderPayload::WashReminder { scheduled_date, .. } => *scheduled_date,
        }
    }
}
