use std::sync::Arc;

use axum::{routing::post, Router};

use crate::features::admin::handlers;
use crate::features::users::UserService;

/// Admin routes, nested under `/api/admin`
pub fn routes(user_service: Arc<UserService>) -> Router {
    Router::new()
        .route("/create-user", post(handlers::create_user))
        .with_state(user_service)
}
