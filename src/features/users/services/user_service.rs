use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::database::is_unique_violation;
use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::services::password::hash_password;
use crate::features::users::dtos::{
    CreateUserDto, UpdateProfileDto, UpdateUserDto, UserListQuery, UserResponseDto,
};
use crate::features::users::models::{check_role_requirements, CreateUser, User, UserRole};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, phone, address, department, \
     ward, profile_image, is_active, created_at, updated_at";

const EMAIL_CONSTRAINT: &str = "users_email_key";

/// Service for user accounts
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up user by email: {:?}", e);
            AppError::Database(e)
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Reject the email when an account already uses it
    pub async fn ensure_email_available(&self, email: &str) -> Result<()> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(normalize_email(email))
                .fetch_one(&self.pool)
                .await?;

        if taken {
            return Err(AppError::BadRequest(
                "User already exists with this email".to_string(),
            ));
        }
        Ok(())
    }

    /// Insert a user on an existing connection or transaction
    pub async fn insert(conn: &mut PgConnection, data: &CreateUser) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, phone, address, department, ward)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(data.name.trim())
        .bind(normalize_email(&data.email))
        .bind(&data.password_hash)
        .bind(data.role)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(&data.department)
        .bind(&data.ward)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, EMAIL_CONSTRAINT) {
                AppError::BadRequest("User already exists with this email".to_string())
            } else {
                tracing::error!("Failed to insert user: {:?}", e);
                AppError::Database(e)
            }
        })
    }

    /// Create an account on behalf of an administrator
    pub async fn create_user(&self, actor: &AuthenticatedUser, dto: CreateUserDto) -> Result<User> {
        if dto.role == UserRole::SuperAdmin && actor.role != UserRole::SuperAdmin {
            return Err(AppError::Forbidden(
                "Only super admins can create super admin accounts".to_string(),
            ));
        }

        check_role_requirements(dto.role, dto.department.as_deref(), dto.ward.as_deref())
            .map_err(AppError::Validation)?;
        self.ensure_email_available(&dto.email).await?;

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

        let mut conn = self.pool.acquire().await?;
        let user = Self::insert(&mut conn, &data).await?;

        tracing::info!(
            "User {} created with role {} by {}",
            user.id,
            user.role,
            actor.user_id
        );
        Ok(user)
    }

    /// List users visible to the actor, newest first
    pub async fn list_users(
        &self,
        actor: &AuthenticatedUser,
        query: &UserListQuery,
    ) -> Result<(Vec<UserResponseDto>, i64)> {
        let pagination = query.pagination();

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_user_filters(&mut count_qb, actor, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM users WHERE TRUE",
            USER_COLUMNS
        ));
        push_user_filters(&mut qb, actor, query);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let users = qb
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list users: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((users.into_iter().map(UserResponseDto::from).collect(), total))
    }

    /// Administrative update; role requirements are checked on the merged record
    pub async fn update_user(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        dto: UpdateUserDto,
    ) -> Result<User> {
        let mut tx = self.pool.begin().await?;
        let mut user = Self::lock_user(&mut tx, id).await?;

        let touches_super_admin =
            user.role == UserRole::SuperAdmin || dto.role == Some(UserRole::SuperAdmin);
        if touches_super_admin && actor.role != UserRole::SuperAdmin {
            return Err(AppError::Forbidden(
                "Only super admins can manage super admin accounts".to_string(),
            ));
        }

        apply_update(&mut user, dto);

        check_role_requirements(user.role, user.department.as_deref(), user.ward.as_deref())
            .map_err(AppError::Validation)?;

        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, phone = $3, address = $4, role = $5, department = $6, ward = $7,
                is_active = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role)
        .bind(&user.department)
        .bind(&user.ward)
        .bind(user.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update user {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        tx.commit().await?;

        tracing::info!("User {} updated by {}", id, actor.user_id);
        Ok(updated)
    }

    /// Load a user row and hold its lock until the transaction ends
    async fn lock_user(conn: &mut PgConnection, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Self-service profile edit
    pub async fn update_profile(&self, user_id: Uuid, dto: UpdateProfileDto) -> Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                profile_image = COALESCE($5, profile_image),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(dto.name.map(|n| n.trim().to_string()))
        .bind(dto.phone)
        .bind(dto.address)
        .bind(dto.profile_image)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

/// Merge an admin edit into the stored record. An empty department or ward clears it.
fn apply_update(user: &mut User, dto: UpdateUserDto) {
    if let Some(name) = dto.name {
        user.name = name.trim().to_string();
    }
    if dto.phone.is_some() {
        user.phone = dto.phone;
    }
    if dto.address.is_some() {
        user.address = dto.address;
    }
    if let Some(role) = dto.role {
        user.role = role;
    }
    if let Some(department) = dto.department {
        user.department = non_empty(department);
    }
    if let Some(ward) = dto.ward {
        user.ward = non_empty(ward);
    }
    if let Some(is_active) = dto.is_active {
        user.is_active = is_active;
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Role scoping plus the optional role/department filters
fn push_user_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    actor: &AuthenticatedUser,
    query: &UserListQuery,
) {
    if actor.is_city_wide() {
        if let Some(department) = &query.department {
            qb.push(" AND department = ").push_bind(department.clone());
        }
    } else {
        match &actor.department {
            Some(department) => {
                qb.push(" AND department = ").push_bind(department.clone());
            }
            None => {
                qb.push(" AND FALSE");
            }
        }
    }

    if let Some(role) = query.role {
        qb.push(" AND role = ").push_bind(role);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::user_with_role;

    fn query(role: Option<UserRole>, department: Option<&str>) -> UserListQuery {
        UserListQuery {
            role,
            department: department.map(str::to_string),
            page: 1,
            page_size: 10,
        }
    }

    fn rendered(actor: &AuthenticatedUser, query: &UserListQuery) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
        push_user_filters(&mut qb, actor, query);
        qb.sql().to_string()
    }

    #[test]
    fn test_department_admin_is_pinned_to_department() {
        let admin = user_with_role(UserRole::DepartmentAdmin);
        assert_eq!(
            rendered(&admin, &query(None, Some("Traffic"))),
            "SELECT * FROM users WHERE TRUE AND department = $1"
        );
    }

    #[test]
    fn test_city_admin_filters() {
        let admin = user_with_role(UserRole::CityAdmin);
        assert_eq!(
            rendered(&admin, &query(None, None)),
            "SELECT * FROM users WHERE TRUE"
        );
        assert_eq!(
            rendered(&admin, &query(Some(UserRole::FieldWorker), Some("Traffic"))),
            "SELECT * FROM users WHERE TRUE AND department = $1 AND role = $2"
        );
    }

    fn regional_admin() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Rita".to_string(),
            email: "rita@example.com".to_string(),
            password_hash: String::new(),
            role: UserRole::RegionalAdmin,
            phone: None,
            address: None,
            department: None,
            ward: Some("Ward 4".to_string()),
            profile_image: None,
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_update_can_clear_ward_on_role_change() {
        let mut user = regional_admin();
        apply_update(
            &mut user,
            UpdateUserDto {
                role: Some(UserRole::Citizen),
                ward: Some(String::new()),
                ..Default::default()
            },
        );

        assert_eq!(user.role, UserRole::Citizen);
        assert_eq!(user.ward, None);
        assert!(check_role_requirements(user.role, None, user.ward.as_deref()).is_ok());
    }

    #[test]
    fn test_update_keeps_omitted_fields() {
        let mut user = regional_admin();
        apply_update(
            &mut user,
            UpdateUserDto {
                name: Some("  Rita M ".to_string()),
                department: Some(" Traffic ".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(user.name, "Rita M");
        assert_eq!(user.department.as_deref(), Some("Traffic"));
        assert_eq!(user.ward.as_deref(), Some("Ward 4"));
        assert!(user.is_active);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
