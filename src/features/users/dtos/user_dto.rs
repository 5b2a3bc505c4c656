use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::users::models::{User, UserRole};
use crate::shared::constants::DEFAULT_PAGE_SIZE;
use crate::shared::types::PaginationQuery;

/// Public view of a user; the password hash never leaves the service
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponseDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponseDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            phone: user.phone,
            address: user.address,
            department: user.department,
            ward: user.ward,
            profile_image: user.profile_image,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Name and contact details embedded in issue and department responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummaryDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Account creation by an administrator
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = crate::shared::validation::validate_password_strength)
    )]
    pub password: String,

    pub role: UserRole,

    #[validate(regex(
        path = *crate::shared::validation::PHONE_REGEX,
        message = "Please enter a valid phone number"
    ))]
    pub phone: Option<String>,

    #[validate(length(max = 300, message = "Address must not exceed 300 characters"))]
    pub address: Option<String>,

    #[validate(length(max = 100, message = "Department must not exceed 100 characters"))]
    pub department: Option<String>,

    #[validate(length(max = 100, message = "Ward must not exceed 100 characters"))]
    pub ward: Option<String>,
}

/// Administrative edit of another account
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(regex(
        path = *crate::shared::validation::PHONE_REGEX,
        message = "Please enter a valid phone number"
    ))]
    pub phone: Option<String>,

    #[validate(length(max = 300, message = "Address must not exceed 300 characters"))]
    pub address: Option<String>,

    pub role: Option<UserRole>,

    /// Empty string clears the department
    #[validate(length(max = 100, message = "Department must not exceed 100 characters"))]
    pub department: Option<String>,

    /// Empty string clears the ward
    #[validate(length(max = 100, message = "Ward must not exceed 100 characters"))]
    pub ward: Option<String>,

    pub is_active: Option<bool>,
}

/// Self-service profile edit
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(regex(
        path = *crate::shared::validation::PHONE_REGEX,
        message = "Please enter a valid phone number"
    ))]
    pub phone: Option<String>,

    #[validate(length(max = 300, message = "Address must not exceed 300 characters"))]
    pub address: Option<String>,

    #[validate(url(message = "Profile image must be a valid URL"))]
    pub profile_image: Option<String>,
}

/// Query params for listing users
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct UserListQuery {
    /// Filter by role
    pub role: Option<UserRole>,
    /// Filter by department (city and super admins only)
    pub department: Option<String>,
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page; `limit` is accepted as an alias
    #[serde(default = "default_page_size", alias = "limit")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl UserListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_dto(password: &str) -> CreateUserDto {
        CreateUserDto {
            name: "Ravi Patel".to_string(),
            email: "ravi@civiclink.test".to_string(),
            password: password.to_string(),
            role: UserRole::FieldWorker,
            phone: Some("+1-555-0101".to_string()),
            address: None,
            department: Some("Sanitation".to_string()),
            ward: None,
        }
    }

    #[test]
    fn test_create_user_password_policy() {
        assert!(create_dto("Str0ng!pass").validate().is_ok());
        assert!(create_dto("Sh0rt!").validate().is_err());
        assert!(create_dto("alllowercase1!").validate().is_err());
    }

    #[test]
    fn test_create_user_rejects_bad_email_and_phone() {
        let mut dto = create_dto("Str0ng!pass");
        dto.email = "not-an-email".to_string();
        dto.phone = Some("call me".to_string());

        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("phone"));
    }

    #[test]
    fn test_response_omits_password() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Ravi".to_string(),
            email: "ravi@civiclink.test".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::Citizen,
            phone: None,
            address: None,
            department: None,
            ward: None,
            profile_image: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&UserResponseDto::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }
}
