pub mod admin;
pub mod analytics;
pub mod auth;
pub mod dashboard;
pub mod departments;
pub mod issues;
pub mod users;
