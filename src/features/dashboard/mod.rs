//! Role-scoped issue statistics for the dashboards. Every role sees numbers
//! computed over the same issues `GET /api/issues` would list for it.

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::DashboardService;
