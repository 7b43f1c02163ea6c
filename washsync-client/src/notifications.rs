use std::time::Duration;

use async_trait::async_trait;
use washsync_core::errors::NotifyError;
use washsync_core::models::ReminderPayload;

/// Opaque identifier the host assigns to a scheduled notification.
pub type NotificationId = String;

/// One entry in the host's notification schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNotification {
    pub id: NotificationId,
    /// The payload as the host stores it. Other subsystems schedule
    /// notifications too, so this is untyped at the boundary.
    pub payload: serde_json::Value,
}

impl ScheduledNotification {
    /// Typed view of the payload. `None` means the notification belongs to
    /// another subsystem or predates the current format, and must be left
    /// alone by bulk cancellation.
    pub fn reminder_payload(&self) -> Option<ReminderPayload> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// Boundary to the host platform's local-notification service, implemented
/// by the embedding app.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Schedules one notification to fire after `delay`, returning the id
    /// the host assigned to it.
    async fn schedule(
        &self,
        payload: &ReminderPayload,
        delay: Duration,
    ) -> Result<NotificationId, NotifyError>;

    /// Cancels the given notifications. Unknown ids are ignored.
    async fn cancel(&self, ids: &[NotificationId]) -> Result<(), NotifyError>;

    /// Every notification currently scheduled on the host, ours or not.
    async fn list_scheduled(&self) -> Result<Vec<ScheduledNotification>, NotifyError>;
}
