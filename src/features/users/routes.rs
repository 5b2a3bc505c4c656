use crate::features::users::handlers::user_handler;
use crate::features::users::services::UserService;
use axum::{
    routing::{get, patch},
    Router,
};
use std::sync::Arc;

pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route(
            "/api/users",
            get(user_handler::list_users).post(user_handler::create_user),
        )
        .route("/api/users/{id}", patch(user_handler::update_user))
        .with_state(service)
}
