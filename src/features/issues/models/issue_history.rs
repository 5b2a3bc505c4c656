use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::IssueStatus;

/// One append-only entry in an issue's status history
#[derive(Debug, Clone, FromRow)]
pub struct IssueHistoryEntry {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub status: IssueStatus,
    pub changed_by: Uuid,
    /// Actor name, joined from users
    pub changed_by_name: Option<String>,
    pub comment: Option<String>,
    pub changed_at: DateTime<Utc>,
}
