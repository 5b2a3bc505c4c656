use crate::core::error::Result;
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::{RequireUserManager, RequireUserViewer};
use crate::features::users::dtos::{CreateUserDto, UpdateUserDto, UserListQuery, UserResponseDto};
use crate::features::users::services::UserService;
use crate::shared::types::{ApiResponse, Meta};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponseDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Insufficient permissions")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    RequireUserViewer(user): RequireUserViewer,
    State(service): State<Arc<UserService>>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponseDto>>>> {
    let (users, total) = service.list_users(&user, &query).await?;
    let meta = Meta::paginated(&query.pagination(), total);
    Ok(Json(ApiResponse::success(Some(users), None, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "Validation error or email already registered"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Insufficient permissions")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    RequireUserManager(user): RequireUserManager,
    State(service): State<Arc<UserService>>,
    AppJson(dto): AppJson<CreateUserDto>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponseDto>>)> {
    dto.validate()?;

    let created = service.create_user(&user, dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(created.into()),
            Some("User created successfully".to_string()),
            None,
        )),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    RequireUserManager(user): RequireUserManager,
    State(service): State<Arc<UserService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateUserDto>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    dto.validate()?;

    let updated = service.update_user(&user, id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(updated.into()),
        Some("User updated successfully".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use crate::features::users::models::UserRole;
    use crate::features::users::routes;
    use crate::features::users::services::UserService;
    use crate::shared::test_helpers::{lazy_pool, user_with_role, with_user};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;

    fn server_as(role: UserRole) -> TestServer {
        let service = Arc::new(UserService::new(lazy_pool()));
        let app = with_user(routes::routes(service), user_with_role(role));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_field_worker_cannot_list_users() {
        let server = server_as(UserRole::FieldWorker);
        let response = server.get("/api/users").await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_department_admin_cannot_create_users() {
        let server = server_as(UserRole::DepartmentAdmin);
        let response = server
            .post("/api/users")
            .json(&json!({
                "name": "New Worker",
                "email": "worker@civiclink.test",
                "password": "Str0ng!pass",
                "role": "field_worker",
                "department": "Sanitation"
            }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_weak_password_rejected_before_storage() {
        let server = server_as(UserRole::CityAdmin);
        let response = server
            .post("/api/users")
            .json(&json!({
                "name": "New Worker",
                "email": "worker@civiclink.test",
                "password": "weakpass",
                "role": "field_worker",
                "department": "Sanitation"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Validation error");
    }

    #[tokio::test]
    async fn test_unauthenticated_request_rejected() {
        let service = Arc::new(UserService::new(lazy_pool()));
        let server = TestServer::new(routes::routes(service)).unwrap();
        server
            .get("/api/users")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
