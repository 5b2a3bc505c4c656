//! User account management.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/users` | List users (department admins see their department) |
//! | POST | `/api/users` | Create an account (city and super admins) |
//! | PATCH | `/api/users/{id}` | Edit or deactivate an account (city and super admins) |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::UserService;
