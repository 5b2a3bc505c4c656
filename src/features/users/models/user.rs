use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Role hierarchy, lowest to highest privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Citizen,
    FieldWorker,
    DepartmentAdmin,
    RegionalAdmin,
    CityAdmin,
    SuperAdmin,
}

impl UserRole {
    pub const ALL: [UserRole; 6] = [
        UserRole::Citizen,
        UserRole::FieldWorker,
        UserRole::DepartmentAdmin,
        UserRole::RegionalAdmin,
        UserRole::CityAdmin,
        UserRole::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Citizen => "citizen",
            UserRole::FieldWorker => "field_worker",
            UserRole::DepartmentAdmin => "department_admin",
            UserRole::RegionalAdmin => "regional_admin",
            UserRole::CityAdmin => "city_admin",
            UserRole::SuperAdmin => "super_admin",
        }
    }

    /// Roles that belong to a department
    pub fn requires_department(&self) -> bool {
        matches!(self, UserRole::FieldWorker | UserRole::DepartmentAdmin)
    }

    /// Roles that are scoped to a ward
    pub fn requires_ward(&self) -> bool {
        matches!(self, UserRole::RegionalAdmin)
    }

    /// City-wide roles see and touch everything
    pub fn is_city_wide(&self) -> bool {
        matches!(self, UserRole::CityAdmin | UserRole::SuperAdmin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database model for user
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub ward: Option<String>,
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for inserting a user; the password is already hashed
#[derive(Debug)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub ward: Option<String>,
}

/// Check that department/ward are present for the roles that need them
pub fn check_role_requirements(
    role: UserRole,
    department: Option<&str>,
    ward: Option<&str>,
) -> Result<(), String> {
    let present = |value: Option<&str>| value.is_some_and(|v| !v.trim().is_empty());

    if role.requires_department() && !present(department) {
        return Err("Department is required for field workers and department admins".to_string());
    }

    if role.requires_ward() && !present(ward) {
        return Err("Ward is required for regional admins".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_names() {
        for role in UserRole::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
        let parsed: UserRole = serde_json::from_str("\"department_admin\"").unwrap();
        assert_eq!(parsed, UserRole::DepartmentAdmin);
    }

    #[test]
    fn test_role_requirements() {
        assert!(check_role_requirements(UserRole::Citizen, None, None).is_ok());
        assert!(check_role_requirements(UserRole::FieldWorker, None, None).is_err());
        assert!(check_role_requirements(UserRole::FieldWorker, Some("  "), None).is_err());
        assert!(check_role_requirements(UserRole::FieldWorker, Some("Sanitation"), None).is_ok());
        assert!(check_role_requirements(UserRole::DepartmentAdmin, None, Some("Ward 1")).is_err());
        assert!(check_role_requirements(UserRole::RegionalAdmin, None, None).is_err());
        assert!(check_role_requirements(UserRole::RegionalAdmin, None, Some("Ward 1")).is_ok());
        assert!(check_role_requirements(UserRole::CityAdmin, None, None).is_ok());
    }
}
