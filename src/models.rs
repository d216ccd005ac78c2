use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::session::Role;

// --- Core Issue Schemas ---

/// IssueStatus
///
/// Lifecycle of a reported issue. Transitions are driven by admins through
/// the triage endpoints; the allowed transitions are server policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Default)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum IssueStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
    Rejected,
}

/// Issue
///
/// A citizen-reported problem as the backend returns it. This is the primary
/// data structure for the portal's list, detail, and dashboard pages.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct Issue {
    pub id: Uuid,
    // The reporting citizen.
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    // Free-form category label, e.g. "roads" or "lighting".
    pub category: String,
    // Human-readable location string as entered by the reporter.
    pub location: String,

    // Storage keys for photos attached at submission time.
    pub photos: Vec<String>,

    pub status: IssueStatus,
    pub likes: i64,

    // Triage fields, only present once an admin has acted on the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_comment: Option<String>,

    // Timestamp handling for JSON serialization.
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// --- Request Payloads (Input Schemas) ---

/// CreateIssueRequest
///
/// Input payload for reporting a new issue (POST /issues).
/// Photo keys are provided here after the client completes the upload flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub photo_keys: Vec<String>,
}

/// UpdateIssueRequest
///
/// Partial update payload for a reporter editing their own issue
/// (PATCH /issues/{id}).
///
/// Uses `Option<T>` for all fields and `#[serde(skip_serializing_if = "Option::is_none")]`
/// so only the provided fields are included in the JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct UpdateIssueRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// TriageRequest
///
/// Admin-only payload for updating the handling of an issue
/// (PATCH /admin/issues/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct TriageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub deadline: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_comment: Option<String>,
}

/// IssueFilter
///
/// Query parameters for the public issue list (GET /issues). Absent fields
/// are omitted from serialization entirely, which keeps the serialized form
/// canonical: two filters with the same effective parameters always produce
/// the same JSON.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
pub struct IssueFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// CreateCommentRequest
///
/// Input payload for posting a new comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub body: String,
}

/// --- Profile & Notification Schemas (Output) ---

/// Comment
///
/// A comment on an issue, augmented with the author's email by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct Comment {
    // BigInt (i64) comment IDs due to the high volume potential.
    pub id: i64,
    pub issue_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    // Joined in by the backend; absent for deleted accounts.
    pub author_email: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserProfile
///
/// Output schema for the authenticated user's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    // Dynamic URL for a profile image/avatar.
    pub avatar_url: Option<String>,
}

/// Notification
///
/// UI-ready notification as delivered by the backend: the raw event joined
/// with actor and issue details.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,

    // Who triggered it? (e.g., "alice@example.com")
    pub actor_email: String,

    // Which issue?
    pub issue_id: Uuid,
    pub issue_title: String,

    // Kind: "like" | "comment" | "status-change"
    // Sent as "type" in JSON for API compatibility; `type` is reserved in Rust.
    #[serde(rename = "type")]
    pub notification_type: String,

    pub is_read: bool,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// --- Dashboard Schemas ---

/// AdminDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_issues: i64,
    pub total_users: i64,
    pub total_likes: i64,
    /// The number of issues still in the `to-do` state.
    pub pending_triage: i64,
}
