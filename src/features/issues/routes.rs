use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::issues::handlers::issue_handler;
use crate::features::issues::services::IssueService;
use crate::shared::constants::{MAX_IMAGE_SIZE, MAX_ISSUE_IMAGES};

/// Room for a full set of images plus multipart overhead
const CREATE_BODY_LIMIT: usize = MAX_ISSUE_IMAGES * MAX_IMAGE_SIZE + 1024 * 1024;

pub fn routes(service: Arc<IssueService>) -> Router {
    Router::new()
        .route(
            "/api/issues",
            get(issue_handler::list_issues).post(issue_handler::create_issue).layer(
                DefaultBodyLimit::max(CREATE_BODY_LIMIT),
            ),
        )
        .route(
            "/api/issues/{id}",
            get(issue_handler::get_issue).patch(issue_handler::update_issue),
        )
        .route(
            "/api/issues/{id}/feedback",
            post(issue_handler::provide_feedback),
        )
        .route("/api/issues/{id}/upvote", post(issue_handler::upvote_issue))
        .with_state(service)
}
