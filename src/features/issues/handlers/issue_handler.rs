use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::RequireReporter;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::issues::dtos::{
    CreateIssueDto, CreateIssueMultipartDto, FeedbackDto, IssueListQuery, IssueResponseDto,
    UpdateIssueDto, UpvoteResponseDto,
};
use crate::features::issues::services::{IssueService, NewImage};
use crate::shared::constants::{ALLOWED_IMAGE_TYPES, MAX_IMAGE_SIZE, MAX_ISSUE_IMAGES};
use crate::shared::types::{ApiResponse, Meta};
use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/issues",
    params(IssueListQuery),
    responses(
        (status = 200, description = "Issues visible to the caller", body = ApiResponse<Vec<IssueResponseDto>>),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "issues",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_issues(
    user: AuthenticatedUser,
    State(service): State<Arc<IssueService>>,
    AppQuery(query): AppQuery<IssueListQuery>,
) -> Result<Json<ApiResponse<Vec<IssueResponseDto>>>> {
    let (issues, total) = service.list_issues(&user, &query).await?;
    let meta = Meta::paginated(&query.pagination(), total);
    Ok(Json(ApiResponse::success(Some(issues), None, Some(meta))))
}

/// Report an issue. Accepts a JSON body, or multipart with a `data` JSON
/// part and up to ten `images` parts.
#[utoipa::path(
    post,
    path = "/api/issues",
    request_body(
        content(
            (CreateIssueDto = "application/json"),
            (CreateIssueMultipartDto = "multipart/form-data")
        )
    ),
    responses(
        (status = 201, description = "Issue reported", body = ApiResponse<IssueResponseDto>),
        (status = 400, description = "Validation error, bad image or no department for the category"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only citizens can report issues"),
        (status = 413, description = "Request body too large")
    ),
    tag = "issues",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_issue(
    RequireReporter(user): RequireReporter,
    State(service): State<Arc<IssueService>>,
    req: Request,
) -> Result<(StatusCode, Json<ApiResponse<IssueResponseDto>>)> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let (dto, images) = if is_multipart {
        let multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        read_issue_form(multipart).await?
    } else {
        let AppJson(dto) = AppJson::<CreateIssueDto>::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(e.message()))?;
        (dto, Vec::new())
    };

    dto.validate()?;

    let issue = service.create_issue(&user, dto, images).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(issue),
            Some("Issue reported successfully".to_string()),
            None,
        )),
    ))
}

/// Collect the `data` part and every `images` part, checking each image
async fn read_issue_form(mut multipart: Multipart) -> Result<(CreateIssueDto, Vec<NewImage>)> {
    let mut dto: Option<CreateIssueDto> = None;
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        match field.name().unwrap_or("") {
            "data" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read issue data: {}", e))
                })?;
                dto = Some(serde_json::from_str(&text).map_err(|e| {
                    AppError::BadRequest(format!("Invalid issue data: {}", e))
                })?);
            }
            "images" => {
                if images.len() == MAX_ISSUE_IMAGES {
                    return Err(AppError::BadRequest(format!(
                        "An issue can have at most {} images",
                        MAX_ISSUE_IMAGES
                    )));
                }

                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let extension = image_extension(&content_type).ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "File type '{}' is not allowed. Allowed types: {}",
                        content_type,
                        ALLOWED_IMAGE_TYPES.join(", ")
                    ))
                })?;

                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read image data: {}", e))
                })?;
                if data.len() > MAX_IMAGE_SIZE {
                    return Err(AppError::BadRequest(format!(
                        "Image too large. Maximum size is {} MB",
                        MAX_IMAGE_SIZE / 1024 / 1024
                    )));
                }

                images.push(NewImage {
                    data: data.to_vec(),
                    content_type,
                    extension,
                });
            }
            other => debug!("Ignoring unknown field: {}", other),
        }
    }

    let dto = dto.ok_or_else(|| AppError::BadRequest("Issue data is required".to_string()))?;
    Ok((dto, images))
}

/// File extension for an accepted image MIME type
fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[utoipa::path(
    get,
    path = "/api/issues/{id}",
    params(
        ("id" = Uuid, Path, description = "Issue ID")
    ),
    responses(
        (status = 200, description = "Issue with its history", body = ApiResponse<IssueResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Issue not found")
    ),
    tag = "issues",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_issue(
    user: AuthenticatedUser,
    State(service): State<Arc<IssueService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IssueResponseDto>>> {
    let issue = service.get_issue(&user, id).await?;
    Ok(Json(ApiResponse::success(Some(issue), None, None)))
}

#[utoipa::path(
    patch,
    path = "/api/issues/{id}",
    params(
        ("id" = Uuid, Path, description = "Issue ID")
    ),
    request_body = UpdateIssueDto,
    responses(
        (status = 200, description = "Issue updated", body = ApiResponse<IssueResponseDto>),
        (status = 400, description = "Validation error, invalid transition or invalid assignee"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "Issue not found"),
        (status = 409, description = "Issue was modified concurrently")
    ),
    tag = "issues",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_issue(
    user: AuthenticatedUser,
    State(service): State<Arc<IssueService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateIssueDto>,
) -> Result<Json<ApiResponse<IssueResponseDto>>> {
    dto.validate()?;

    let issue = service.update_issue(&user, id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(issue),
        Some("Issue updated successfully".to_string()),
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/issues/{id}/feedback",
    params(
        ("id" = Uuid, Path, description = "Issue ID")
    ),
    request_body = FeedbackDto,
    responses(
        (status = 200, description = "Feedback recorded", body = ApiResponse<IssueResponseDto>),
        (status = 400, description = "Validation error or issue not resolved"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the reporter can provide feedback"),
        (status = 404, description = "Issue not found"),
        (status = 409, description = "Feedback already provided")
    ),
    tag = "issues",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn provide_feedback(
    user: AuthenticatedUser,
    State(service): State<Arc<IssueService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<FeedbackDto>,
) -> Result<Json<ApiResponse<IssueResponseDto>>> {
    dto.validate()?;

    let issue = service.provide_feedback(&user, id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(issue),
        Some("Thank you for your feedback".to_string()),
        None,
    )))
}

#[utoipa::path(
    post,
    path = "/api/issues/{id}/upvote",
    params(
        ("id" = Uuid, Path, description = "Issue ID")
    ),
    responses(
        (status = 200, description = "Current upvote count", body = ApiResponse<UpvoteResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only citizens can upvote issues"),
        (status = 404, description = "Issue not found")
    ),
    tag = "issues",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upvote_issue(
    user: AuthenticatedUser,
    State(service): State<Arc<IssueService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UpvoteResponseDto>>> {
    let upvote = service.upvote(&user, id).await?;
    Ok(Json(ApiResponse::success(Some(upvote), None, None)))
}

#[cfg(test)]
mod tests {
    use super::image_extension;
    use crate::features::issues::dtos::CreateIssueDto;
    use crate::features::issues::routes;
    use crate::features::issues::services::IssueService;
    use crate::features::users::models::UserRole;
    use crate::shared::test_helpers::{lazy_pool, test_storage, user_with_role, with_user};
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;
    use validator::Validate;

    fn server(role: UserRole) -> TestServer {
        let service = Arc::new(IssueService::new(lazy_pool(), test_storage()));
        let app = with_user(routes::routes(service), user_with_role(role));
        TestServer::new(app).unwrap()
    }

    fn issue_json() -> serde_json::Value {
        json!({
            "title": "Overflowing bin",
            "description": "The bin outside the school has not been emptied",
            "category": "sanitation",
            "location": {
                "address": "12 Market St",
                "coordinates": {"latitude": 12.97, "longitude": 77.59}
            },
            "ward": "Ward 1"
        })
    }

    #[test]
    fn test_issue_fixture_is_valid() {
        let dto: CreateIssueDto = serde_json::from_value(issue_json()).unwrap();
        assert!(dto.validate().is_ok());
    }

    #[tokio::test]
    async fn test_only_citizens_report_issues() {
        for role in [UserRole::FieldWorker, UserRole::CityAdmin, UserRole::SuperAdmin] {
            server(role)
                .post("/api/issues")
                .json(&issue_json())
                .await
                .assert_status(StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_coordinates() {
        let mut body = issue_json();
        body["location"]["coordinates"]["latitude"] = 120.0.into();

        let response = server(UserRole::Citizen)
            .post("/api/issues")
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        assert!(body["errors"][0]
            .as_str()
            .unwrap()
            .starts_with("location.coordinates.latitude:"));
    }

    #[tokio::test]
    async fn test_multipart_rejects_non_image_part() {
        let form = MultipartForm::new()
            .add_text("data", issue_json().to_string())
            .add_part(
                "images",
                Part::bytes(b"plain text".to_vec())
                    .file_name("notes.txt")
                    .mime_type("text/plain"),
            );

        let response = server(UserRole::Citizen)
            .post("/api/issues")
            .multipart(form)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("'text/plain' is not allowed"));
    }

    #[tokio::test]
    async fn test_multipart_requires_data_part() {
        let form = MultipartForm::new().add_part(
            "images",
            Part::bytes(vec![0xFF, 0xD8, 0xFF])
                .file_name("photo.jpg")
                .mime_type("image/jpeg"),
        );

        server(UserRole::Citizen)
            .post("/api/issues")
            .multipart(form)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_comment_too_long() {
        server(UserRole::DepartmentAdmin)
            .patch(&format!("/api/issues/{}", Uuid::new_v4()))
            .json(&json!({"status": "in_progress", "comment": "x".repeat(501)}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_status_is_bad_request() {
        server(UserRole::DepartmentAdmin)
            .patch(&format!("/api/issues/{}", Uuid::new_v4()))
            .json(&json!({"status": "archived"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_feedback_rating_out_of_range() {
        server(UserRole::Citizen)
            .post(&format!("/api/issues/{}/feedback", Uuid::new_v4()))
            .json(&json!({"rating": 6}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upvote_is_citizen_only() {
        server(UserRole::FieldWorker)
            .post(&format!("/api/issues/{}/upvote", Uuid::new_v4()))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("image/webp"), Some("webp"));
        assert_eq!(image_extension("image/svg+xml"), None);
    }
}
