//! Capability guards for handlers.
//!
//! Each guard extracts the authenticated user and checks one capability from
//! [`policy`](crate::features::auth::policy). They are request-parts
//! extractors, so a rejected request never has its body read.

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::{self, Capability};
use axum::{extract::FromRequestParts, http::request::Parts};

fn authorized_user(parts: &Parts, capability: Capability) -> Result<AuthenticatedUser, AppError> {
    let user = parts
        .extensions
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))?;

    policy::authorize(user, capability)?;
    Ok(user.clone())
}

/// Guard for filing issues. Only citizens pass.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireReporter(user): RequireReporter) { ... }
/// ```
pub struct RequireReporter(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireReporter
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authorized_user(parts, Capability::CreateIssue).map(RequireReporter)
    }
}

/// Guard for reading departments (department, regional, city and super admins)
pub struct RequireDepartmentViewer(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireDepartmentViewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authorized_user(parts, Capability::ListDepartments).map(RequireDepartmentViewer)
    }
}

/// Guard for creating departments (city and super admins)
pub struct RequireDepartmentManager(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireDepartmentManager
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authorized_user(parts, Capability::ManageDepartments).map(RequireDepartmentManager)
    }
}

/// Guard for listing users (department, city and super admins)
pub struct RequireUserViewer(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireUserViewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authorized_user(parts, Capability::ListUsers).map(RequireUserViewer)
    }
}

/// Guard for creating and editing accounts (city and super admins)
pub struct RequireUserManager(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireUserManager
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authorized_user(parts, Capability::CreateUsers)?;
        policy::authorize(&user, Capability::ManageUsers)?;
        Ok(RequireUserManager(user))
    }
}
