use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "analytics_event_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsEventType {
    IssueCreated,
    IssueResolved,
    UserRegistered,
    DepartmentActivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "analytics_entity_type")]
pub enum AnalyticsEntityType {
    Issue,
    User,
    Department,
}

/// Free-form context stored alongside an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Hours from report to resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AnalyticsEvent {
    pub event_type: AnalyticsEventType,
    pub entity_id: Uuid,
    pub entity_type: AnalyticsEntityType,
    pub metadata: AnalyticsMetadata,
}
