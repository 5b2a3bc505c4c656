use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RequireUserManager;
use crate::features::users::dtos::{CreateUserDto, UserResponseDto};
use crate::features::users::UserService;
use crate::shared::types::ApiResponse;

/// Create a staff or citizen account
#[utoipa::path(
    post,
    path = "/api/admin/create-user",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "Validation error or email already registered"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - city or super admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    RequireUserManager(admin): RequireUserManager,
    State(service): State<Arc<UserService>>,
    AppJson(dto): AppJson<CreateUserDto>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponseDto>>)> {
    dto.validate()?;

    let user = service.create_user(&admin, dto).await?;
    tracing::info!("Admin {} created user {} ({})", admin.user_id, user.id, user.role);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(user.into()),
            Some("User created successfully".to_string()),
            None,
        )),
    ))
}

#[cfg(test)]
mod tests {
    use crate::features::admin::routes;
    use crate::features::users::models::UserRole;
    use crate::features::users::UserService;
    use crate::shared::test_helpers::{lazy_pool, user_with_role, with_user};
    use axum::http::StatusCode;
    use axum::Router;
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;

    fn server(role: UserRole) -> TestServer {
        let service = Arc::new(UserService::new(lazy_pool()));
        let app = Router::new().nest("/api/admin", routes::routes(service));
        TestServer::new(with_user(app, user_with_role(role))).unwrap()
    }

    fn body(password: &str) -> serde_json::Value {
        json!({
            "name": "Ravi",
            "email": "ravi@civiclink.test",
            "password": password,
            "role": "field_worker",
            "department": "Sanitation"
        })
    }

    #[tokio::test]
    async fn test_regional_admin_cannot_create_users() {
        server(UserRole::RegionalAdmin)
            .post("/api/admin/create-user")
            .json(&body("Str0ng@pass"))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_password_policy() {
        let response = server(UserRole::SuperAdmin)
            .post("/api/admin/create-user")
            .json(&body("alllowercase1"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        assert!(body["errors"][0]
            .as_str()
            .unwrap()
            .starts_with("password: Password must contain"));
    }
}
