//! Access policy: what each role may do, and which issues it may touch.
//!
//! | Capability | Roles |
//! |------------|-------|
//! | `CreateIssue`, `ProvideFeedback`, `UpvoteIssue` | citizen |
//! | `UpdateIssueStatus` | field_worker and every admin role |
//! | `AssignIssue`, `SetPriority`, `SetEstimate` | department, regional, city and super admin |
//! | `ListDepartments` | department, regional, city and super admin |
//! | `ManageDepartments` | city and super admin |
//! | `ListUsers` | department, city and super admin |
//! | `CreateUsers`, `ManageUsers` | city and super admin |
//! | `ViewStats` | every role |

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::issues::models::IssueStatus;
use crate::features::users::models::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CreateIssue,
    ProvideFeedback,
    UpvoteIssue,
    UpdateIssueStatus,
    AssignIssue,
    SetPriority,
    SetEstimate,
    ListDepartments,
    ManageDepartments,
    ListUsers,
    CreateUsers,
    ManageUsers,
    ViewStats,
}

impl Capability {
    fn denial_message(&self) -> &'static str {
        match self {
            Capability::CreateIssue => "Only citizens can report issues",
            Capability::ProvideFeedback => "Only citizens can provide feedback",
            Capability::UpvoteIssue => "Only citizens can upvote issues",
            Capability::UpdateIssueStatus => "Insufficient permissions to update issue status",
            Capability::AssignIssue => "Insufficient permissions to assign issues",
            Capability::SetPriority => "Insufficient permissions to change issue priority",
            Capability::SetEstimate => "Insufficient permissions to set resolution estimates",
            Capability::ListDepartments => "Insufficient permissions to view departments",
            Capability::ManageDepartments => "Insufficient permissions to manage departments",
            Capability::ListUsers => "Insufficient permissions to view users",
            Capability::CreateUsers => "Insufficient permissions to create users",
            Capability::ManageUsers => "Insufficient permissions to manage users",
            Capability::ViewStats => "Insufficient permissions to view statistics",
        }
    }
}

pub fn role_has(role: UserRole, capability: Capability) -> bool {
    use Capability::*;
    use UserRole::*;

    match capability {
        CreateIssue | ProvideFeedback | UpvoteIssue => role == Citizen,
        UpdateIssueStatus => role != Citizen,
        AssignIssue | SetPriority | SetEstimate | ListDepartments => matches!(
            role,
            DepartmentAdmin | RegionalAdmin | CityAdmin | SuperAdmin
        ),
        ListUsers => matches!(role, DepartmentAdmin | CityAdmin | SuperAdmin),
        ManageDepartments | CreateUsers | ManageUsers => role.is_city_wide(),
        ViewStats => true,
    }
}

/// Fail with 403 unless the user's role grants the capability
pub fn authorize(user: &AuthenticatedUser, capability: Capability) -> Result<()> {
    if user.can(capability) {
        Ok(())
    } else {
        Err(AppError::Forbidden(capability.denial_message().to_string()))
    }
}

/// Statuses a field worker may move an issue into
pub fn field_worker_may_set(status: IssueStatus) -> bool {
    matches!(status, IssueStatus::InProgress | IssueStatus::Resolved)
}

// =============================================================================
// ISSUE SCOPE
// =============================================================================

/// The ownership fields of an issue that scope checks look at
#[derive(Debug, Clone, Copy)]
pub struct IssueScope<'a> {
    pub reported_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub department: &'a str,
    pub ward: &'a str,
}

fn same(value: Option<&String>, expected: &str) -> bool {
    value.is_some_and(|v| v == expected)
}

pub fn can_view_issue(user: &AuthenticatedUser, issue: IssueScope<'_>) -> bool {
    match user.role {
        UserRole::CityAdmin | UserRole::SuperAdmin => true,
        UserRole::RegionalAdmin => same(user.ward.as_ref(), issue.ward),
        UserRole::DepartmentAdmin => same(user.department.as_ref(), issue.department),
        UserRole::FieldWorker => {
            issue.assigned_to == Some(user.user_id)
                || same(user.department.as_ref(), issue.department)
        }
        UserRole::Citizen => issue.reported_by == user.user_id,
    }
}

pub fn can_modify_issue(user: &AuthenticatedUser, issue: IssueScope<'_>) -> bool {
    match user.role {
        UserRole::FieldWorker => issue.assigned_to == Some(user.user_id),
        UserRole::Citizen => false,
        _ => can_view_issue(user, issue),
    }
}

/// Row filter applied to issue listings and statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueListScope {
    ReportedBy(Uuid),
    /// Own assignments plus the department's unclaimed (pending) issues
    FieldWorker {
        user_id: Uuid,
        department: Option<String>,
    },
    Department(String),
    Ward(String),
    All,
    /// Misconfigured account (admin without department/ward): sees nothing
    Nothing,
}

impl IssueListScope {
    pub fn for_user(user: &AuthenticatedUser) -> Self {
        match user.role {
            UserRole::Citizen => IssueListScope::ReportedBy(user.user_id),
            UserRole::FieldWorker => IssueListScope::FieldWorker {
                user_id: user.user_id,
                department: user.department.clone(),
            },
            UserRole::DepartmentAdmin => user
                .department
                .clone()
                .map_or(IssueListScope::Nothing, IssueListScope::Department),
            UserRole::RegionalAdmin => user
                .ward
                .clone()
                .map_or(IssueListScope::Nothing, IssueListScope::Ward),
            UserRole::CityAdmin | UserRole::SuperAdmin => IssueListScope::All,
        }
    }

    /// Append the scope as ` AND ...` to a query whose issues table is aliased `i`
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            IssueListScope::ReportedBy(user_id) => {
                qb.push(" AND i.reported_by = ").push_bind(*user_id);
            }
            IssueListScope::FieldWorker {
                user_id,
                department: Some(department),
            } => {
                qb.push(" AND (i.assigned_to = ")
                    .push_bind(*user_id)
                    .push(" OR (i.department = ")
                    .push_bind(department.clone())
                    .push(" AND i.status = ")
                    .push_bind(IssueStatus::Pending)
                    .push("))");
            }
            IssueListScope::FieldWorker {
                user_id,
                department: None,
            } => {
                qb.push(" AND i.assigned_to = ").push_bind(*user_id);
            }
            IssueListScope::Department(department) => {
                qb.push(" AND i.department = ").push_bind(department.clone());
            }
            IssueListScope::Ward(ward) => {
                qb.push(" AND i.ward = ").push_bind(ward.clone());
            }
            IssueListScope::All => {}
            IssueListScope::Nothing => {
                qb.push(" AND FALSE");
            }
        }
    }
}

/// Which optional list filters a role is allowed to apply
pub fn may_filter_by_department(role: UserRole) -> bool {
    role.is_city_wide()
}

pub fn may_filter_by_ward(role: UserRole) -> bool {
    role.is_city_wide() || role == UserRole::RegionalAdmin
}

pub fn may_filter_by_assignee(role: UserRole) -> bool {
    role.is_city_wide() || role == UserRole::DepartmentAdmin
}
