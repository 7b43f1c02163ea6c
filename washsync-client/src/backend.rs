use async_trait::async_trait;
use chrono::NaiveDate;
use washsync_core::models::Task;
use washsync_core::SyncResult;

/// Boundary to the fleet backend, implemented by the embedding app over its
/// API client. Completion submission is split into upload and commit so the
/// sync coordinator can roll the upload back when the commit fails.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Live task list for one calendar date.
    async fn fetch_tasks_for_date(&self, date: NaiveDate) -> SyncResult<Vec<Task>>;

    /// Uploads a captured photo to object storage, returning its URL.
    async fn upload_photo(&self, image_path: &str) -> SyncResult<String>;

    /// Commits the completion record referencing an already uploaded photo.
    async fn commit_completion(
        &self,
        schedule_id: &str,
        image_url: &str,
        notes: Option<&str>,
    ) -> SyncResult<()>;

    /// Deletes an uploaded object. The compensating action for a commit
    /// that failed after its upload succeeded.
    async fn delete_upload(&self, image_url: &str) -> SyncResult<()>;
}
