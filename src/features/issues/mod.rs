//! Issue reporting and resolution.
//!
//! Citizens report issues; field workers and admins move them through
//! `pending → assigned → in_progress → resolved → closed`, with `rejected`
//! reachable from any open state. Every change is recorded in the issue
//! history and bumps the issue version.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/issues` | List issues in the caller's scope |
//! | POST | `/api/issues` | Report an issue (JSON or multipart with images) |
//! | GET | `/api/issues/{id}` | Issue detail with history |
//! | PATCH | `/api/issues/{id}` | Change status, assignee, priority or estimate |
//! | POST | `/api/issues/{id}/feedback` | Reporter rates a resolved issue |
//! | POST | `/api/issues/{id}/upvote` | Citizen upvote |

pub mod dtos;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod services;

pub use services::IssueService;
