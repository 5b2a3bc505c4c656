//! Issue status lifecycle and the update planner.
//!
//! ```text
//! pending ──► assigned ──► in_progress ──► resolved ──► closed
//!    ▲  │        │  ▲           │
//!    └──┼────────┘  └───────────┘
//!       └──► rejected ◄── (from pending, assigned, in_progress)
//! ```
//!
//! `closed` and `rejected` are terminal. Staying in the same status is always
//! allowed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::{self, Capability};
use crate::features::issues::models::{Issue, IssuePriority, IssueStatus};
use crate::features::users::models::UserRole;

pub fn can_transition(from: IssueStatus, to: IssueStatus) -> bool {
    use IssueStatus::*;

    if from == to {
        return true;
    }

    matches!(
        (from, to),
        (Pending, Assigned)
            | (Pending, Rejected)
            | (Assigned, Pending)
            | (Assigned, InProgress)
            | (Assigned, Rejected)
            | (InProgress, Assigned)
            | (InProgress, Resolved)
            | (InProgress, Rejected)
            | (Resolved, Closed)
    )
}

/// Requested changes to an issue
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub status: Option<IssueStatus>,
    pub assigned_to: Option<Uuid>,
    pub priority: Option<IssuePriority>,
    pub estimated_resolution_time: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

/// Check the capability behind every field the request touches
pub fn authorize_update(user: &AuthenticatedUser, request: &UpdateRequest) -> Result<()> {
    if let Some(status) = request.status {
        policy::authorize(user, Capability::UpdateIssueStatus)?;
        if user.role == UserRole::FieldWorker && !policy::field_worker_may_set(status) {
            return Err(AppError::Forbidden(
                "Field workers can only mark issues as in progress or resolved".to_string(),
            ));
        }
    }
    if request.assigned_to.is_some() {
        policy::authorize(user, Capability::AssignIssue)?;
    }
    if request.priority.is_some() {
        policy::authorize(user, Capability::SetPriority)?;
    }
    if request.estimated_resolution_time.is_some() {
        policy::authorize(user, Capability::SetEstimate)?;
    }
    Ok(())
}

/// The latest history entry, used to detect repeated submissions
#[derive(Debug, Clone)]
pub struct LastHistory {
    pub status: IssueStatus,
    pub changed_by: Uuid,
    pub comment: Option<String>,
}

/// Field values after a planned update
#[derive(Debug, Clone, PartialEq)]
pub struct IssueChanges {
    pub status: IssueStatus,
    pub assigned_to: Option<Uuid>,
    pub priority: IssuePriority,
    pub estimated_resolution_time: Option<DateTime<Utc>>,
    /// Set when this update is the first move into `resolved`
    pub resolved_at: Option<DateTime<Utc>>,
    pub history_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePlan {
    /// Nothing to write: no field changes and no new comment
    NoOp,
    Apply(IssueChanges),
}

/// Work out what an update does to `issue`, validating the transition.
/// Assigning without an explicit status implies `assigned`; moving back to
/// `pending` clears the assignee.
pub fn plan_update(
    issue: &Issue,
    actor_id: Uuid,
    request: &UpdateRequest,
    last_history: Option<&LastHistory>,
    now: DateTime<Utc>,
) -> Result<UpdatePlan> {
    let implied_status = request
        .assigned_to
        .is_some()
        .then_some(IssueStatus::Assigned);
    let status = request.status.or(implied_status).unwrap_or(issue.status);

    if !can_transition(issue.status, status) {
        return Err(AppError::BadRequest(format!(
            "Invalid status transition from {} to {}",
            issue.status, status
        )));
    }

    let assigned_to = match status {
        IssueStatus::Pending => None,
        _ => request.assigned_to.or(issue.assigned_to),
    };

    if status == IssueStatus::Assigned && assigned_to.is_none() {
        return Err(AppError::BadRequest(
            "An assignee is required to assign an issue".to_string(),
        ));
    }

    let priority = request.priority.unwrap_or(issue.priority);
    let estimated_resolution_time = request
        .estimated_resolution_time
        .or(issue.estimated_resolution_time);

    let changed = status != issue.status
        || assigned_to != issue.assigned_to
        || priority != issue.priority
        || estimated_resolution_time != issue.estimated_resolution_time;

    let comment = request
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    if !changed {
        let repeated = match (comment, last_history) {
            (None, _) => true,
            (Some(comment), Some(last)) => {
                last.changed_by == actor_id
                    && last.status == status
                    && last.comment.as_deref() == Some(comment)
            }
            (Some(_), None) => false,
        };
        if repeated {
            return Ok(UpdatePlan::NoOp);
        }
    }

    let first_resolution = status == IssueStatus::Resolved
        && issue.status != IssueStatus::Resolved
        && issue.actual_resolution_time.is_none();

    Ok(UpdatePlan::Apply(IssueChanges {
        status,
        assigned_to,
        priority,
        estimated_resolution_time,
        resolved_at: first_resolution.then_some(now),
        history_comment: comment.map(str::to_string),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::issues::models::IssueCategory;
    use crate::shared::test_helpers::user_with_role;

    fn issue(status: IssueStatus, assigned_to: Option<Uuid>) -> Issue {
        let now = Utc::now();
        Issue {
            id: Uuid::new_v4(),
            title: "Overflowing bin".to_string(),
            description: "Bin on Main St has not been emptied".to_string(),
            category: IssueCategory::Sanitation,
            priority: IssuePriority::Medium,
            status,
            reported_by: Uuid::new_v4(),
            assigned_to,
            department: "Sanitation".to_string(),
            address: "1 Main St".to_string(),
            latitude: 12.97,
            longitude: 77.59,
            images: vec![],
            estimated_resolution_time: None,
            actual_resolution_time: None,
            feedback_rating: None,
            feedback_comment: None,
            feedback_provided_at: None,
            upvotes: 0,
            ward: "Ward 1".to_string(),
            contact_phone: None,
            preferred_contact: None,
            is_anonymous: false,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn status_request(status: IssueStatus) -> UpdateRequest {
        UpdateRequest {
            status: Some(status),
            ..Default::default()
        }
    }

    fn apply(plan: UpdatePlan) -> IssueChanges {
        match plan {
            UpdatePlan::Apply(changes) => changes,
            UpdatePlan::NoOp => panic!("expected changes, got a no-op"),
        }
    }

    #[test]
    fn test_transition_table() {
        use IssueStatus::*;

        let allowed = [
            (Pending, Assigned),
            (Pending, Rejected),
            (Assigned, Pending),
            (Assigned, InProgress),
            (Assigned, Rejected),
            (InProgress, Assigned),
            (InProgress, Resolved),
            (InProgress, Rejected),
            (Resolved, Closed),
        ];

        for from in IssueStatus::ALL {
            for to in IssueStatus::ALL {
                let expected = from == to || allowed.contains(&(from, to));
                assert_eq!(can_transition(from, to), expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        for to in IssueStatus::ALL {
            if to != IssueStatus::Closed {
                assert!(!can_transition(IssueStatus::Closed, to));
            }
            if to != IssueStatus::Rejected {
                assert!(!can_transition(IssueStatus::Rejected, to));
            }
        }
    }

    #[test]
    fn test_invalid_transition_is_bad_request() {
        let current = issue(IssueStatus::Pending, None);
        let err = plan_update(
            &current,
            Uuid::new_v4(),
            &status_request(IssueStatus::Resolved),
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_assignment_implies_assigned_status() {
        let worker = Uuid::new_v4();
        let current = issue(IssueStatus::Pending, None);
        let request = UpdateRequest {
            assigned_to: Some(worker),
            ..Default::default()
        };

        let changes = apply(plan_update(&current, Uuid::new_v4(), &request, None, Utc::now()).unwrap());
        assert_eq!(changes.status, IssueStatus::Assigned);
        assert_eq!(changes.assigned_to, Some(worker));
    }

    #[test]
    fn test_assigned_requires_assignee() {
        let current = issue(IssueStatus::Pending, None);
        let result = plan_update(
            &current,
            Uuid::new_v4(),
            &status_request(IssueStatus::Assigned),
            None,
            Utc::now(),
        );
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_back_to_pending_clears_assignee() {
        let current = issue(IssueStatus::Assigned, Some(Uuid::new_v4()));
        let changes = apply(
            plan_update(
                &current,
                Uuid::new_v4(),
                &status_request(IssueStatus::Pending),
                None,
                Utc::now(),
            )
            .unwrap(),
        );
        assert_eq!(changes.assigned_to, None);
    }

    #[test]
    fn test_first_resolution_is_stamped_once() {
        let now = Utc::now();
        let worker = Uuid::new_v4();
        let current = issue(IssueStatus::InProgress, Some(worker));

        let changes = apply(
            plan_update(&current, worker, &status_request(IssueStatus::Resolved), None, now)
                .unwrap(),
        );
        assert_eq!(changes.resolved_at, Some(now));

        let mut resolved = issue(IssueStatus::Resolved, Some(worker));
        resolved.actual_resolution_time = Some(now);
        let changes = apply(
            plan_update(
                &resolved,
                worker,
                &UpdateRequest {
                    comment: Some("Photos attached".to_string()),
                    ..Default::default()
                },
                None,
                Utc::now(),
            )
            .unwrap(),
        );
        assert_eq!(changes.resolved_at, None);
    }

    #[test]
    fn test_same_status_without_comment_is_noop() {
        let worker = Uuid::new_v4();
        let current = issue(IssueStatus::InProgress, Some(worker));
        let plan = plan_update(
            &current,
            worker,
            &status_request(IssueStatus::InProgress),
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(plan, UpdatePlan::NoOp);
    }

    #[test]
    fn test_repeated_comment_is_noop() {
        let worker = Uuid::new_v4();
        let current = issue(IssueStatus::InProgress, Some(worker));
        let request = UpdateRequest {
            status: Some(IssueStatus::InProgress),
            comment: Some("On site".to_string()),
            ..Default::default()
        };
        let last = LastHistory {
            status: IssueStatus::InProgress,
            changed_by: worker,
            comment: Some("On site".to_string()),
        };

        let plan = plan_update(&current, worker, &request, Some(&last), Utc::now()).unwrap();
        assert_eq!(plan, UpdatePlan::NoOp);

        // Same words from someone else still get recorded
        let plan = plan_update(&current, Uuid::new_v4(), &request, Some(&last), Utc::now()).unwrap();
        assert!(matches!(plan, UpdatePlan::Apply(_)));
    }

    #[test]
    fn test_new_comment_is_recorded() {
        let worker = Uuid::new_v4();
        let current = issue(IssueStatus::InProgress, Some(worker));
        let request = UpdateRequest {
            comment: Some("  Waiting for parts  ".to_string()),
            ..Default::default()
        };

        let changes = apply(plan_update(&current, worker, &request, None, Utc::now()).unwrap());
        assert_eq!(changes.status, IssueStatus::InProgress);
        assert_eq!(changes.history_comment.as_deref(), Some("Waiting for parts"));
    }

    #[test]
    fn test_field_worker_field_permissions() {
        let worker = user_with_role(UserRole::FieldWorker);

        assert!(authorize_update(&worker, &status_request(IssueStatus::Resolved)).is_ok());
        assert!(matches!(
            authorize_update(&worker, &status_request(IssueStatus::Closed)),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_update(
                &worker,
                &UpdateRequest {
                    priority: Some(IssuePriority::Urgent),
                    ..Default::default()
                }
            ),
            Err(AppError::Forbidden(_))
        ));
        assert!(authorize_update(
            &worker,
            &UpdateRequest {
                comment: Some("note".to_string()),
                ..Default::default()
            }
        )
        .is_ok());
    }

    #[test]
    fn test_admin_field_permissions() {
        let admin = user_with_role(UserRole::DepartmentAdmin);
        let request = UpdateRequest {
            status: Some(IssueStatus::Closed),
            assigned_to: Some(Uuid::new_v4()),
            priority: Some(IssuePriority::High),
            estimated_resolution_time: Some(Utc::now()),
            comment: None,
        };
        assert!(authorize_update(&admin, &request).is_ok());

        let citizen = user_with_role(UserRole::Citizen);
        assert!(authorize_update(&citizen, &status_request(IssueStatus::Closed)).is_err());
    }
}
