use serde::Serialize;
use utoipa::ToSchema;

use crate::features::issues::models::{IssueCategory, IssuePriority, IssueStatus};

// ============================================================================
// Counts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusCountDto {
    pub status: IssueStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PriorityCountDto {
    pub priority: IssuePriority,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CategoryCountDto {
    pub category: IssueCategory,
    pub count: i64,
}

// ============================================================================
// Stats
// ============================================================================

/// Issue statistics over the issues the caller can list
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStatsDto {
    pub total_issues: i64,
    /// Every status, zero counts included
    pub by_status: Vec<StatusCountDto>,
    /// Only priorities with at least one issue
    pub by_priority: Vec<PriorityCountDto>,
    /// Only categories with at least one issue, largest first
    pub by_category: Vec<CategoryCountDto>,
    /// Issues whose resolution was recorded today (server time)
    pub resolved_today: i64,
    /// Mean hours from report to resolution over resolved issues
    pub average_resolution_hours: Option<f64>,
    /// Mean citizen feedback rating (1-5)
    pub average_rating: Option<f64>,
}
