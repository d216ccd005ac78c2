use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{CacheCoordinator, Tag};
use crate::error::{FetchError, MutationError};
use crate::models::{
    AdminDashboardStats, Comment, CreateCommentRequest, CreateIssueRequest, Issue, IssueFilter,
    IssueStatus, Notification, TriageRequest, UpdateIssueRequest, UserProfile,
};
use crate::transport::WriteMethod;

/// Tag labels for the coarse data families the portal caches. Every read
/// below declares which of these it depends on; every write declares which
/// it dirties.
pub mod tags {
    pub const ISSUES: &str = "Issues";
    pub const COMMENTS: &str = "Comments";
    pub const USER: &str = "User";
    pub const NOTIFICATIONS: &str = "Notifications";
    pub const STATS: &str = "Stats";
}

fn read_payload<T: DeserializeOwned>(value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))
}

fn write_payload<T: DeserializeOwned>(value: Value) -> Result<T, MutationError> {
    serde_json::from_value(value).map_err(|e| MutationError::Decode(e.to_string()))
}

/// PortalApi
///
/// The typed operations the pages call. Each method is a thin declaration
/// over the coordinator: endpoint, parameters or body, and the tags the
/// operation reads or dirties. No caching logic lives here.
pub struct PortalApi {
    cache: Arc<CacheCoordinator>,
}

impl PortalApi {
    pub fn new(cache: Arc<CacheCoordinator>) -> Self {
        Self { cache }
    }

    // --- Reads ---

    /// The public issue list, optionally filtered (GET /issues).
    pub async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, FetchError> {
        let params = serde_json::to_value(filter).map_err(|e| FetchError::Decode(e.to_string()))?;
        let value = self
            .cache
            .read("issues", &params, &[Tag::from(tags::ISSUES)])
            .await?;
        read_payload(value)
    }

    /// One issue in full (GET /issues/{id}).
    pub async fn get_issue(&self, id: Uuid) -> Result<Issue, FetchError> {
        let value = self
            .cache
            .read(
                &format!("issues/{id}"),
                &Value::Null,
                &[Tag::from(tags::ISSUES)],
            )
            .await?;
        read_payload(value)
    }

    /// The signed-in citizen's own reports (GET /me/issues).
    pub async fn my_issues(&self) -> Result<Vec<Issue>, FetchError> {
        let value = self
            .cache
            .read("me/issues", &Value::Null, &[Tag::from(tags::ISSUES)])
            .await?;
        read_payload(value)
    }

    /// The discussion under one issue (GET /issues/{id}/comments).
    pub async fn list_comments(&self, issue_id: Uuid) -> Result<Vec<Comment>, FetchError> {
        let value = self
            .cache
            .read(
                &format!("issues/{issue_id}/comments"),
                &Value::Null,
                &[Tag::from(tags::COMMENTS)],
            )
            .await?;
        read_payload(value)
    }

    /// The signed-in user's profile (GET /me).
    pub async fn profile(&self) -> Result<UserProfile, FetchError> {
        let value = self
            .cache
            .read("me", &Value::Null, &[Tag::from(tags::USER)])
            .await?;
        read_payload(value)
    }

    /// The unread-first notification feed (GET /me/notifications).
    pub async fn notifications(&self) -> Result<Vec<Notification>, FetchError> {
        let value = self
            .cache
            .read(
                "me/notifications",
                &Value::Null,
                &[Tag::from(tags::NOTIFICATIONS)],
            )
            .await?;
        read_payload(value)
    }

    /// The full triage queue, admin only server-side (GET /admin/issues).
    pub async fn admin_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, FetchError> {
        let params = serde_json::to_value(filter).map_err(|e| FetchError::Decode(e.to_string()))?;
        let value = self
            .cache
            .read("admin/issues", &params, &[Tag::from(tags::ISSUES)])
            .await?;
        read_payload(value)
    }

    /// Dashboard totals (GET /admin/stats).
    pub async fn admin_stats(&self) -> Result<AdminDashboardStats, FetchError> {
        let value = self
            .cache
            .read("admin/stats", &Value::Null, &[Tag::from(tags::STATS)])
            .await?;
        read_payload(value)
    }

    // --- Writes ---

    /// Reports a new issue (POST /issues).
    pub async fn create_issue(&self, request: &CreateIssueRequest) -> Result<Issue, MutationError> {
        let body =
            serde_json::to_value(request).map_err(|e| MutationError::Decode(e.to_string()))?;
        let value = self
            .cache
            .write(
                WriteMethod::Post,
                "issues",
                &body,
                &[Tag::from(tags::ISSUES), Tag::from(tags::STATS)],
            )
            .await?;
        write_payload(value)
    }

    /// A reporter editing their own issue (PATCH /issues/{id}).
    pub async fn update_issue(
        &self,
        id: Uuid,
        request: &UpdateIssueRequest,
    ) -> Result<Issue, MutationError> {
        let body =
            serde_json::to_value(request).map_err(|e| MutationError::Decode(e.to_string()))?;
        let value = self
            .cache
            .write(
                WriteMethod::Patch,
                &format!("issues/{id}"),
                &body,
                &[Tag::from(tags::ISSUES)],
            )
            .await?;
        write_payload(value)
    }

    /// Withdraws a report (DELETE /issues/{id}).
    pub async fn delete_issue(&self, id: Uuid) -> Result<(), MutationError> {
        self.cache
            .write(
                WriteMethod::Delete,
                &format!("issues/{id}"),
                &Value::Null,
                &[Tag::from(tags::ISSUES), Tag::from(tags::STATS)],
            )
            .await?;
        Ok(())
    }

    /// Admin moves an issue through its lifecycle
    /// (PATCH /admin/issues/{id}/status).
    pub async fn set_status(&self, id: Uuid, status: IssueStatus) -> Result<Issue, MutationError> {
        let value = self
            .cache
            .write(
                WriteMethod::Patch,
                &format!("admin/issues/{id}/status"),
                &json!({ "status": status }),
                &[Tag::from(tags::ISSUES), Tag::from(tags::STATS)],
            )
            .await?;
        write_payload(value)
    }

    /// Admin sets deadline, assignee, importance, or an internal comment
    /// (PATCH /admin/issues/{id}).
    pub async fn triage_issue(
        &self,
        id: Uuid,
        request: &TriageRequest,
    ) -> Result<Issue, MutationError> {
        let body =
            serde_json::to_value(request).map_err(|e| MutationError::Decode(e.to_string()))?;
        let value = self
            .cache
            .write(
                WriteMethod::Patch,
                &format!("admin/issues/{id}"),
                &body,
                &[Tag::from(tags::ISSUES)],
            )
            .await?;
        write_payload(value)
    }

    /// Upvotes an issue (POST /issues/{id}/like).
    pub async fn like_issue(&self, id: Uuid) -> Result<Issue, MutationError> {
        let value = self
            .cache
            .write(
                WriteMethod::Post,
                &format!("issues/{id}/like"),
                &Value::Null,
                &[Tag::from(tags::ISSUES)],
            )
            .await?;
        write_payload(value)
    }

    /// Posts a comment under an issue (POST /issues/{id}/comments).
    pub async fn add_comment(
        &self,
        issue_id: Uuid,
        request: &CreateCommentRequest,
    ) -> Result<Comment, MutationError> {
        let body =
            serde_json::to_value(request).map_err(|e| MutationError::Decode(e.to_string()))?;
        let value = self
            .cache
            .write(
                WriteMethod::Post,
                &format!("issues/{issue_id}/comments"),
                &body,
                &[Tag::from(tags::COMMENTS)],
            )
            .await?;
        write_payload(value)
    }

    /// Removes a comment (DELETE /issues/{issue_id}/comments/{comment_id}).
    pub async fn delete_comment(
        &self,
        issue_id: Uuid,
        comment_id: i64,
    ) -> Result<(), MutationError> {
        self.cache
            .write(
                WriteMethod::Delete,
                &format!("issues/{issue_id}/comments/{comment_id}"),
                &Value::Null,
                &[Tag::from(tags::COMMENTS)],
            )
            .await?;
        Ok(())
    }

    /// Marks one notification as seen (PATCH /me/notifications/{id}/read).
    pub async fn mark_notification_read(&self, id: Uuid) -> Result<(), MutationError> {
        self.cache
            .write(
                WriteMethod::Patch,
                &format!("me/notifications/{id}/read"),
                &Value::Null,
                &[Tag::from(tags::NOTIFICATIONS)],
            )
            .await?;
        Ok(())
    }
}
