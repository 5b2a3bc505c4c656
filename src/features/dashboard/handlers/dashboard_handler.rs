use axum::{extract::State, Json};
use std::sync::Arc;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::{self, Capability};
use crate::features::dashboard::dtos::*;
use crate::features::dashboard::services::DashboardService;
use crate::shared::types::ApiResponse;

/// Issue statistics for the caller's dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "dashboard",
    responses(
        (status = 200, description = "Dashboard statistics", body = ApiResponse<DashboardStatsDto>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_stats(
    user: AuthenticatedUser,
    State(service): State<Arc<DashboardService>>,
) -> Result<Json<ApiResponse<DashboardStatsDto>>, AppError> {
    policy::authorize(&user, Capability::ViewStats)?;

    let stats = service.get_stats(&user).await?;
    Ok(Json(ApiResponse::success(Some(stats), None, None)))
}

#[cfg(test)]
mod tests {
    use crate::features::dashboard::{routes, DashboardService};
    use crate::shared::test_helpers::lazy_pool;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stats_require_authentication() {
        let service = Arc::new(DashboardService::new(lazy_pool()));
        let server = TestServer::new(routes(service)).unwrap();

        server
            .get("/api/dashboard/stats")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
