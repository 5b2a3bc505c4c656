//! Municipal departments. A department handles one or more categories; its
//! worker list is derived from active field workers whose `department`
//! matches the department name.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::DepartmentService;
