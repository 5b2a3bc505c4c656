use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::admin::handlers as admin_handlers;
use crate::features::auth;
use crate::features::dashboard::{dtos as dashboard_dtos, handlers as dashboard_handlers};
use crate::features::departments::{
    dtos as departments_dtos, handlers::department_handler, models as departments_models,
};
use crate::features::issues::{dtos as issues_dtos, handlers::issue_handler, models as issues_models};
use crate::features::users::{dtos as users_dtos, handlers::user_handler, models as users_models};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::register,
        auth::handlers::login,
        auth::handlers::validate_token,
        auth::handlers::get_me,
        auth::handlers::update_me,
        // Users
        user_handler::list_users,
        user_handler::create_user,
        user_handler::update_user,
        // Admin
        admin_handlers::create_user,
        // Departments
        department_handler::list_departments,
        department_handler::get_department,
        department_handler::create_department,
        // Issues
        issue_handler::list_issues,
        issue_handler::create_issue,
        issue_handler::get_issue,
        issue_handler::update_issue,
        issue_handler::provide_feedback,
        issue_handler::upvote_issue,
        // Dashboard
        dashboard_handlers::get_stats,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Auth
            auth::model::Claims,
            auth::dtos::RegisterRequestDto,
            auth::dtos::LoginRequestDto,
            auth::dtos::AuthResponseDto,
            auth::dtos::TokenValidationDto,
            ApiResponse<auth::dtos::AuthResponseDto>,
            ApiResponse<auth::dtos::TokenValidationDto>,
            // Users
            users_models::UserRole,
            users_dtos::UserResponseDto,
            users_dtos::UserSummaryDto,
            users_dtos::CreateUserDto,
            users_dtos::UpdateUserDto,
            users_dtos::UpdateProfileDto,
            ApiResponse<users_dtos::UserResponseDto>,
            ApiResponse<Vec<users_dtos::UserResponseDto>>,
            // Departments
            departments_models::DepartmentCategory,
            departments_dtos::CreateDepartmentDto,
            departments_dtos::DepartmentResponseDto,
            ApiResponse<departments_dtos::DepartmentResponseDto>,
            ApiResponse<Vec<departments_dtos::DepartmentResponseDto>>,
            // Issues
            issues_models::IssueStatus,
            issues_models::IssuePriority,
            issues_models::IssueCategory,
            issues_dtos::CoordinatesDto,
            issues_dtos::LocationDto,
            issues_dtos::ContactInfoDto,
            issues_dtos::CreateIssueDto,
            issues_dtos::CreateIssueMultipartDto,
            issues_dtos::UpdateIssueDto,
            issues_dtos::FeedbackDto,
            issues_dtos::FeedbackResponseDto,
            issues_dtos::HistoryEntryDto,
            issues_dtos::IssueResponseDto,
            issues_dtos::UpvoteResponseDto,
            ApiResponse<issues_dtos::IssueResponseDto>,
            ApiResponse<Vec<issues_dtos::IssueResponseDto>>,
            ApiResponse<issues_dtos::UpvoteResponseDto>,
            // Dashboard
            dashboard_dtos::StatusCountDto,
            dashboard_dtos::PriorityCountDto,
            dashboard_dtos::CategoryCountDto,
            dashboard_dtos::DashboardStatsDto,
            ApiResponse<dashboard_dtos::DashboardStatsDto>,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login and token validation"),
        (name = "users", description = "User account management"),
        (name = "admin", description = "Account provisioning (city and super admins)"),
        (name = "departments", description = "Municipal departments"),
        (name = "issues", description = "Issue reporting, triage and resolution"),
        (name = "dashboard", description = "Role-scoped issue statistics"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "CivicLink API",
        version = "0.1.0",
        description = "API documentation for CivicLink",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI document
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
