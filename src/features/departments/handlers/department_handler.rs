use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::guards::{RequireDepartmentManager, RequireDepartmentViewer};
use crate::features::departments::dtos::{CreateDepartmentDto, DepartmentResponseDto};
use crate::features::departments::services::DepartmentService;
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
    path = "/api/departments",
    responses(
        (status = 200, description = "Active departments", body = ApiResponse<Vec<DepartmentResponseDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Insufficient permissions")
    ),
    tag = "departments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_departments(
    RequireDepartmentViewer(_user): RequireDepartmentViewer,
    State(service): State<Arc<DepartmentService>>,
) -> Result<Json<ApiResponse<Vec<DepartmentResponseDto>>>> {
    let departments = service.list_departments().await?;
    let meta = Meta::total(departments.len() as i64);
    Ok(Json(ApiResponse::success(Some(departments), None, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    params(
        ("id" = Uuid, Path, description = "Department ID")
    ),
    responses(
        (status = 200, description = "Department details", body = ApiResponse<DepartmentResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Department not found")
    ),
    tag = "departments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_department(
    RequireDepartmentViewer(_user): RequireDepartmentViewer,
    State(service): State<Arc<DepartmentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DepartmentResponseDto>>> {
    let department = service.get_department(id).await?;
    Ok(Json(ApiResponse::success(Some(department), None, None)))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartmentDto,
    responses(
        (status = 201, description = "Department created", body = ApiResponse<DepartmentResponseDto>),
        (status = 400, description = "Validation error, duplicate name or invalid head"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Insufficient permissions")
    ),
    tag = "departments",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_department(
    RequireDepartmentManager(user): RequireDepartmentManager,
    State(service): State<Arc<DepartmentService>>,
    AppJson(dto): AppJson<CreateDepartmentDto>,
) -> Result<(StatusCode, Json<ApiResponse<DepartmentResponseDto>>)> {
    dto.validate()?;

    tracing::debug!("User {} creating department '{}'", user.user_id, dto.name);
    let department = service.create_department(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(department),
            Some("Department created successfully".to_string()),
            None,
        )),
    ))
}

#[cfg(test)]
mod tests {
    use crate::features::departments::routes;
    use crate::features::departments::services::DepartmentService;
    use crate::features::users::models::UserRole;
    use crate::shared::test_helpers::{lazy_pool, user_with_role, with_user};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    fn server(role: UserRole) -> TestServer {
        let service = Arc::new(DepartmentService::new(lazy_pool()));
        TestServer::new(with_user(routes::routes(service), user_with_role(role))).unwrap()
    }

    #[tokio::test]
    async fn test_citizens_and_workers_cannot_list_departments() {
        for role in [UserRole::Citizen, UserRole::FieldWorker] {
            server(role)
                .get("/api/departments")
                .await
                .assert_status(StatusCode::FORBIDDEN);
            server(role)
                .get(&format!("/api/departments/{}", Uuid::new_v4()))
                .await
                .assert_status(StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_only_city_admins_create_departments() {
        let body = json!({
            "name": "Parks",
            "description": "Parks and recreation",
            "categories": ["environment"],
            "head_id": Uuid::new_v4(),
            "contact_email": "parks@civiclink.test"
        });

        for role in [UserRole::DepartmentAdmin, UserRole::RegionalAdmin] {
            server(role)
                .post("/api/departments")
                .json(&body)
                .await
                .assert_status(StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_create_department_validation() {
        let response = server(UserRole::CityAdmin)
            .post("/api/departments")
            .json(&json!({
                "name": "",
                "description": "Parks and recreation",
                "categories": [],
                "head_id": Uuid::new_v4(),
                "contact_email": "parks@civiclink.test"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }
}
