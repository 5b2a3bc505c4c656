use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgHasArrayType, PgTypeInfo};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Broad category a department is responsible for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "department_category", rename_all = "snake_case", no_pg_array)]
#[serde(rename_all = "snake_case")]
pub enum DepartmentCategory {
    Sanitation,
    Infrastructure,
    Utilities,
    Traffic,
    Environment,
    Safety,
    Other,
}

impl PgHasArrayType for DepartmentCategory {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_department_category")
    }
}

impl std::fmt::Display for DepartmentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DepartmentCategory::Sanitation => "sanitation",
            DepartmentCategory::Infrastructure => "infrastructure",
            DepartmentCategory::Utilities => "utilities",
            DepartmentCategory::Traffic => "traffic",
            DepartmentCategory::Environment => "environment",
            DepartmentCategory::Safety => "safety",
            DepartmentCategory::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Database model for department
#[derive(Debug, Clone, FromRow)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub categories: Vec<DepartmentCategory>,
    pub head_id: Uuid,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
