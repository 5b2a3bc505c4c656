use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::auth::policy::IssueScope;
use crate::features::departments::models::DepartmentCategory;

/// Issue lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "issue_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    Assigned,
    InProgress,
    Resolved,
    Closed,
    Rejected,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 6] = [
        IssueStatus::Pending,
        IssueStatus::Assigned,
        IssueStatus::InProgress,
        IssueStatus::Resolved,
        IssueStatus::Closed,
        IssueStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::Assigned => "assigned",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Closed => "closed",
            IssueStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema,
)]
#[sqlx(type_name = "issue_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IssuePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for IssuePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssuePriority::Low => "low",
            IssuePriority::Medium => "medium",
            IssuePriority::High => "high",
            IssuePriority::Urgent => "urgent",
        };
        write!(f, "{}", s)
    }
}

/// Reported issue category. The first seven values are the department
/// categories; the rest are older fine-grained names kept for existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "issue_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Sanitation,
    Infrastructure,
    Utilities,
    Traffic,
    Environment,
    Safety,
    Other,
    WaterSupply,
    RoadMaintenance,
    StreetLighting,
    Drainage,
    PublicSafety,
    ParksRecreation,
    NoisePollution,
    AirQuality,
    Electricity,
}

impl IssueCategory {
    /// Department category that handles issues of this kind
    pub fn department_category(&self) -> DepartmentCategory {
        match self {
            IssueCategory::Sanitation | IssueCategory::Drainage => DepartmentCategory::Sanitation,
            IssueCategory::Infrastructure | IssueCategory::RoadMaintenance => {
                DepartmentCategory::Infrastructure
            }
            IssueCategory::Utilities
            | IssueCategory::WaterSupply
            | IssueCategory::StreetLighting
            | IssueCategory::Electricity => DepartmentCategory::Utilities,
            IssueCategory::Traffic => DepartmentCategory::Traffic,
            IssueCategory::Environment
            | IssueCategory::ParksRecreation
            | IssueCategory::NoisePollution
            | IssueCategory::AirQuality => DepartmentCategory::Environment,
            IssueCategory::Safety | IssueCategory::PublicSafety => DepartmentCategory::Safety,
            IssueCategory::Other => DepartmentCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Sanitation => "sanitation",
            IssueCategory::Infrastructure => "infrastructure",
            IssueCategory::Utilities => "utilities",
            IssueCategory::Traffic => "traffic",
            IssueCategory::Environment => "environment",
            IssueCategory::Safety => "safety",
            IssueCategory::Other => "other",
            IssueCategory::WaterSupply => "water_supply",
            IssueCategory::RoadMaintenance => "road_maintenance",
            IssueCategory::StreetLighting => "street_lighting",
            IssueCategory::Drainage => "drainage",
            IssueCategory::PublicSafety => "public_safety",
            IssueCategory::ParksRecreation => "parks_recreation",
            IssueCategory::NoisePollution => "noise_pollution",
            IssueCategory::AirQuality => "air_quality",
            IssueCategory::Electricity => "electricity",
        }
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database model for issue
#[derive(Debug, Clone, FromRow)]
pub struct Issue {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    pub status: IssueStatus,
    pub reported_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub department: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub images: Vec<String>,
    pub estimated_resolution_time: Option<DateTime<Utc>>,
    pub actual_resolution_time: Option<DateTime<Utc>>,
    pub feedback_rating: Option<i16>,
    pub feedback_comment: Option<String>,
    pub feedback_provided_at: Option<DateTime<Utc>>,
    pub upvotes: i32,
    pub ward: String,
    pub contact_phone: Option<String>,
    pub preferred_contact: Option<String>,
    pub is_anonymous: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    pub fn scope(&self) -> IssueScope<'_> {
        IssueScope {
            reported_by: self.reported_by,
            assigned_to: self.assigned_to,
            department: &self.department,
            ward: &self.ward,
        }
    }

    /// Hours between the report and its resolution, if resolved
    pub fn resolution_hours(&self) -> Option<f64> {
        self.actual_resolution_time
            .map(|resolved| (resolved - self.created_at).num_seconds() as f64 / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_category_mapping() {
        let cases = [
            (IssueCategory::WaterSupply, DepartmentCategory::Utilities),
            (IssueCategory::RoadMaintenance, DepartmentCategory::Infrastructure),
            (IssueCategory::StreetLighting, DepartmentCategory::Utilities),
            (IssueCategory::Drainage, DepartmentCategory::Sanitation),
            (IssueCategory::PublicSafety, DepartmentCategory::Safety),
            (IssueCategory::ParksRecreation, DepartmentCategory::Environment),
            (IssueCategory::NoisePollution, DepartmentCategory::Environment),
            (IssueCategory::AirQuality, DepartmentCategory::Environment),
            (IssueCategory::Electricity, DepartmentCategory::Utilities),
            (IssueCategory::Traffic, DepartmentCategory::Traffic),
            (IssueCategory::Other, DepartmentCategory::Other),
        ];

        for (category, expected) in cases {
            assert_eq!(category.department_category(), expected, "{}", category);
        }
    }

    #[test]
    fn test_department_categories_map_to_themselves() {
        for name in [
            "sanitation",
            "infrastructure",
            "utilities",
            "traffic",
            "environment",
            "safety",
            "other",
        ] {
            let category: IssueCategory = serde_json::from_value(name.into()).unwrap();
            assert_eq!(category.department_category().to_string(), name);
        }
    }

    #[test]
    fn test_status_wire_names() {
        for status in IssueStatus::ALL {
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::from(status.as_str())
            );
        }
        assert_eq!(IssuePriority::default(), IssuePriority::Medium);
    }
}
