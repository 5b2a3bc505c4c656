//! Administrative account provisioning.

pub mod handlers;
pub mod routes;
