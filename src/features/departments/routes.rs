use crate::features::departments::handlers::department_handler;
use crate::features::departments::services::DepartmentService;
use axum::{routing::get, Router};
use std::sync::Arc;

pub fn routes(service: Arc<DepartmentService>) -> Router {
    Router::new()
        .route(
            "/api/departments",
            get(department_handler::list_departments).post(department_handler::create_department),
        )
        .route("/api/departments/{id}", get(department_handler::get_department))
        .with_state(service)
}
