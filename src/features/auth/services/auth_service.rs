use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::analytics::models::{
    AnalyticsEntityType, AnalyticsEvent, AnalyticsEventType, AnalyticsMetadata,
};
use crate::features::analytics::AnalyticsService;
use crate::features::auth::dtos::{AuthResponseDto, LoginRequestDto, RegisterRequestDto};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::services::password::{hash_password, verify_password};
use crate::features::auth::services::TokenService;
use crate::features::users::dtos::{UpdateProfileDto, UserResponseDto};
use crate::features::users::models::{check_role_requirements, CreateUser, User, UserRole};
use crate::features::users::UserService;

/// Service for registration, login and the caller's own profile
pub struct AuthService {
    users: Arc<UserService>,
    tokens: Arc<TokenService>,
    allow_privileged_registration: bool,
}

impl AuthService {
    pub fn new(
        users: Arc<UserService>,
        tokens: Arc<TokenService>,
        allow_privileged_registration: bool,
    ) -> Self {
        Self {
            users,
            tokens,
            allow_privileged_registration,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new account and record a `user_registered` event in the same transaction
    pub async fn register(&self, dto: RegisterRequestDto) -> Result<AuthResponseDto> {
        check_registration_role(dto.role, self.allow_privileged_registration)?;
        check_role_requirements(dto.role, dto.department.as_deref(), dto.ward.as_deref())
            .map_err(AppError::Validation)?;
        self.users.ensure_email_available(&dto.email).await?;

        let data = CreateUser {
            name: dto.name,
            email: dto.email,
            password_hash: hash_password(dto.password).await?,
            role: dto.role,
            phone: dto.phone,
            address: dto.address,
            department: dto.department,
            ward: dto.ward,
        };

        let mut tx = self.users.pool().begin().await?;
        let user = UserService::insert(&mut tx, &data).await?;
        AnalyticsService::record(
            &mut tx,
            &AnalyticsEvent {
                event_type: AnalyticsEventType::UserRegistered,
                entity_id: user.id,
                entity_type: AnalyticsEntityType::User,
                metadata: AnalyticsMetadata {
                    user_role: Some(user.role.to_string()),
                    department: user.department.clone(),
                    ward: user.ward.clone(),
                    ..Default::default()
                },
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!("User {} registered with role {}", user.id, user.role);
        self.auth_response(user)
    }

    pub async fn login(&self, dto: LoginRequestDto) -> Result<AuthResponseDto> {
        let user = self.users.find_by_email(&dto.email).await?;
        let user = verify_credentials(user, dto.password).await?;

        tracing::info!("User {} logged in", user.id);
        self.auth_response(user)
    }

    pub async fn me(&self, user: &AuthenticatedUser) -> Result<UserResponseDto> {
        Ok(self.users.get_by_id(user.user_id).await?.into())
    }

    pub async fn update_me(
        &self,
        user: &AuthenticatedUser,
        dto: UpdateProfileDto,
    ) -> Result<UserResponseDto> {
        let updated = self.users.update_profile(user.user_id, dto).await?;
        tracing::info!("User {} updated their profile", user.user_id);
        Ok(updated.into())
    }

    fn auth_response(&self, user: User) -> Result<AuthResponseDto> {
        Ok(AuthResponseDto {
            token: self.tokens.issue_token(&user)?,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.ttl_secs(),
            user: user.into(),
        })
    }
}

/// Self-registration only creates citizens unless privileged registration is enabled.
/// Super admin accounts can never be self-registered.
pub fn check_registration_role(role: UserRole, allow_privileged: bool) -> Result<()> {
    match role {
        UserRole::Citizen => Ok(()),
        UserRole::SuperAdmin => Err(AppError::Forbidden(
            "Super admin accounts cannot be self-registered".to_string(),
        )),
        _ if allow_privileged => Ok(()),
        _ => Err(AppError::Forbidden(
            "Only citizen accounts can be self-registered".to_string(),
        )),
    }
}

/// Login decision. Inactive accounts are refused before the password is checked.
pub async fn verify_credentials(user: Option<User>, password: String) -> Result<User> {
    let user = user.ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    if !verify_password(password, user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    async fn stored_user(password: &str, is_active: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Amina".to_string(),
            email: "amina@civiclink.test".to_string(),
            password_hash: hash_password(password.to_string()).await.unwrap(),
            role: UserRole::Citizen,
            phone: None,
            address: None,
            department: None,
            ward: None,
            profile_image: None,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_registration_roles() {
        assert!(check_registration_role(UserRole::Citizen, false).is_ok());
        assert!(matches!(
            check_registration_role(UserRole::FieldWorker, false),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_registration_role(UserRole::FieldWorker, true).is_ok());
        assert!(check_registration_role(UserRole::CityAdmin, true).is_ok());
        assert!(matches!(
            check_registration_role(UserRole::SuperAdmin, true),
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_email_is_unauthorized() {
        let result = verify_credentials(None, "secret1".to_string()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let user = stored_user("secret1", true).await;
        let result = verify_credentials(Some(user), "nope".to_string()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_inactive_account_is_forbidden_even_with_right_password() {
        let user = stored_user("secret1", false).await;
        let result = verify_credentials(Some(user.clone()), "secret1".to_string()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let result = verify_credentials(Some(user), "wrong".to_string()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let user = stored_user("secret1", true).await;
        let id = user.id;
        let verified = verify_credentials(Some(user), "secret1".to_string())
            .await
            .unwrap();
        assert_eq!(verified.id, id);
    }
}
