use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::auth::model::Claims;
use crate::features::users::dtos::UserResponseDto;
use crate::features::users::models::UserRole;

/// Request DTO for self-registration
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequestDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    /// Defaults to `citizen`
    #[serde(default = "default_role")]
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

fn default_role() -> UserRole {
    UserRole::Citizen
}

/// Request DTO for login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequestDto {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Response DTO for authentication (register/login)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponseDto {
    /// HS256 access token
    pub token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub user: UserResponseDto,
}

/// Result of validating the caller's own token
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenValidationDto {
    pub valid: bool,
    pub user: Claims,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_defaults_to_citizen() {
        let dto: RegisterRequestDto = serde_json::from_str(
            r#"{"name": "Amina", "email": "amina@civiclink.test", "password": "secret1"}"#,
        )
        .unwrap();
        assert_eq!(dto.role, UserRole::Citizen);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_register_short_password() {
        let dto: RegisterRequestDto = serde_json::from_str(
            r#"{"name": "Amina", "email": "amina@civiclink.test", "password": "12345"}"#,
        )
        .unwrap();
        assert!(dto.validate().unwrap_err().field_errors().contains_key("password"));
    }
}
