use std::sync::Arc;

use chrono::Utc;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::analytics::models::{
    AnalyticsEntityType, AnalyticsEvent, AnalyticsEventType, AnalyticsMetadata,
};
use crate::features::analytics::AnalyticsService;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::{self, Capability, IssueListScope};
use crate::features::departments::DepartmentService;
use crate::features::issues::dtos::{
    CreateIssueDto, FeedbackDto, IssueListQuery, IssueResponseDto, UpdateIssueDto,
    UpvoteResponseDto,
};
use crate::features::issues::lifecycle::{self, LastHistory, UpdatePlan};
use crate::features::issues::models::{Issue, IssueHistoryEntry, IssueStatus};
use crate::features::users::dtos::UserSummaryDto;
use crate::features::users::models::UserRole;
use crate::modules::storage::MinIOClient;
use crate::shared::constants::{ISSUE_CREATED_COMMENT, MAX_ISSUE_IMAGES};

/// Columns of `issues` aliased `i`, in `Issue` field order
const ISSUE_COLUMNS: &str = "i.id, i.title, i.description, i.category, i.priority, i.status, \
     i.reported_by, i.assigned_to, i.department, i.address, i.latitude, i.longitude, i.images, \
     i.estimated_resolution_time, i.actual_resolution_time, i.feedback_rating, \
     i.feedback_comment, i.feedback_provided_at, i.upvotes, i.ward, i.contact_phone, \
     i.preferred_contact, i.is_anonymous, i.version, i.created_at, i.updated_at";

const PEOPLE_COLUMNS: &str = "r.name AS reporter_name, r.email AS reporter_email, \
     r.phone AS reporter_phone, a.name AS assignee_name, a.email AS assignee_email, \
     a.phone AS assignee_phone";

const PEOPLE_JOINS: &str =
    "FROM issues i JOIN users r ON r.id = i.reported_by LEFT JOIN users a ON a.id = i.assigned_to";

/// Issue joined with reporter and assignee details
#[derive(Debug, FromRow)]
struct IssueRow {
    #[sqlx(flatten)]
    issue: Issue,
    reporter_name: String,
    reporter_email: String,
    reporter_phone: Option<String>,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
    assignee_phone: Option<String>,
}

/// An uploaded image awaiting storage
#[derive(Debug)]
pub struct NewImage {
    pub data: Vec<u8>,
    pub content_type: String,
    pub extension: &'static str,
}

/// Candidate assignee as stored
#[derive(Debug, FromRow)]
struct AssigneeRow {
    role: UserRole,
    is_active: bool,
    department: Option<String>,
}

/// Only an active field worker of the issue's department can take it
fn is_valid_assignee(row: Option<&AssigneeRow>, department: &str) -> bool {
    row.is_some_and(|r| {
        r.role == UserRole::FieldWorker && r.is_active && r.department.as_deref() == Some(department)
    })
}

/// Service for issue reporting, triage and resolution
pub struct IssueService {
    pool: PgPool,
    storage: Arc<MinIOClient>,
}

impl IssueService {
    pub fn new(pool: PgPool, storage: Arc<MinIOClient>) -> Self {
        Self { pool, storage }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// List issues in the caller's scope, newest first
    pub async fn list_issues(
        &self,
        user: &AuthenticatedUser,
        query: &IssueListQuery,
    ) -> Result<(Vec<IssueResponseDto>, i64)> {
        let pagination = query.pagination();

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM issues i WHERE TRUE");
        push_list_filters(&mut count_qb, user, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}, {} {} WHERE TRUE",
            ISSUE_COLUMNS, PEOPLE_COLUMNS, PEOPLE_JOINS
        ));
        push_list_filters(&mut qb, user, query);
        qb.push(" ORDER BY i.created_at DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows = qb
            .build_query_as::<IssueRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list issues: {:?}", e);
                AppError::Database(e)
            })?;

        let items = rows.into_iter().map(|row| to_response(row, user)).collect();
        Ok((items, total))
    }

    /// Get one issue with its history, if the caller may view it
    pub async fn get_issue(&self, user: &AuthenticatedUser, id: Uuid) -> Result<IssueResponseDto> {
        let row = self.fetch_row(id).await?;

        if !policy::can_view_issue(user, row.issue.scope()) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        let history = self.fetch_history(id).await?;
        let mut response = to_response(row, user);
        response.history = Some(history.into_iter().map(Into::into).collect());
        Ok(response)
    }

    async fn fetch_row(&self, id: Uuid) -> Result<IssueRow> {
        sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {}, {} {} WHERE i.id = $1",
            ISSUE_COLUMNS, PEOPLE_COLUMNS, PEOPLE_JOINS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Issue not found".to_string()))
    }

    async fn fetch_history(&self, id: Uuid) -> Result<Vec<IssueHistoryEntry>> {
        let entries = sqlx::query_as::<_, IssueHistoryEntry>(
            r#"
            SELECT h.id, h.issue_id, h.status, h.changed_by, u.name AS changed_by_name,
                   h.comment, h.changed_at
            FROM issue_history h
            LEFT JOIN users u ON u.id = h.changed_by
            WHERE h.issue_id = $1
            ORDER BY h.changed_at ASC, h.id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lock the issue row for the rest of the transaction
    async fn lock_issue(conn: &mut PgConnection, id: Uuid) -> Result<Issue> {
        sqlx::query_as::<_, Issue>(&format!(
            "SELECT {} FROM issues i WHERE i.id = $1 FOR UPDATE",
            ISSUE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Issue not found".to_string()))
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// File a new issue. Images are stored first, then the issue, its first
    /// history entry and the `issue_created` event are written in one transaction.
    pub async fn create_issue(
        &self,
        user: &AuthenticatedUser,
        dto: CreateIssueDto,
        uploads: Vec<NewImage>,
    ) -> Result<IssueResponseDto> {
        policy::authorize(user, Capability::CreateIssue)?;

        if dto.images.len() + uploads.len() > MAX_ISSUE_IMAGES {
            return Err(AppError::BadRequest(format!(
                "An issue can have at most {} images",
                MAX_ISSUE_IMAGES
            )));
        }

        let department = match dto.department {
            Some(department) => department.trim().to_string(),
            None => {
                let category = dto.category.department_category();
                DepartmentService::department_for_category(&self.pool, category)
                    .await?
                    .ok_or_else(|| {
                        AppError::BadRequest(format!(
                            "No active department handles {} issues",
                            category
                        ))
                    })?
            }
        };

        let mut uploaded = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            let url = self
                .storage
                .upload_image(&upload.data, &upload.content_type, upload.extension)
                .await?;
            uploaded.push(url);
        }
        let mut images = dto.images;
        images.extend(uploaded.iter().cloned());

        let contact = if dto.is_anonymous {
            None
        } else {
            dto.contact_info
        };
        let (contact_phone, preferred_contact) = match contact {
            Some(contact) => (contact.phone, contact.preferred_contact),
            None => (None, None),
        };

        let created = async {
            let mut tx = self.pool.begin().await?;

            let issue = sqlx::query_as::<_, Issue>(&format!(
                r#"
                INSERT INTO issues AS i (
                    title, description, category, priority, reported_by, department,
                    address, latitude, longitude, images, ward, contact_phone,
                    preferred_contact, is_anonymous
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                RETURNING {}
                "#,
                ISSUE_COLUMNS
            ))
            .bind(dto.title.trim())
            .bind(dto.description.trim())
            .bind(dto.category)
            .bind(dto.priority)
            .bind(user.user_id)
            .bind(&department)
            .bind(dto.location.address.trim())
            .bind(dto.location.coordinates.latitude)
            .bind(dto.location.coordinates.longitude)
            .bind(&images)
            .bind(dto.ward.trim())
            .bind(contact_phone)
            .bind(preferred_contact)
            .bind(dto.is_anonymous)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert issue: {:?}", e);
                AppError::Database(e)
            })?;

            append_history(
                &mut tx,
                issue.id,
                IssueStatus::Pending,
                user.user_id,
                Some(ISSUE_CREATED_COMMENT),
            )
            .await?;

            AnalyticsService::record(
                &mut tx,
                &AnalyticsEvent {
                    event_type: AnalyticsEventType::IssueCreated,
                    entity_id: issue.id,
                    entity_type: AnalyticsEntityType::Issue,
                    metadata: AnalyticsMetadata {
                        category: Some(issue.category.to_string()),
                        department: Some(issue.department.clone()),
                        ward: Some(issue.ward.clone()),
                        priority: Some(issue.priority.to_string()),
                        ..Default::default()
                    },
                },
            )
            .await?;

            tx.commit().await?;
            Ok::<_, AppError>(issue)
        }
        .await;

        let issue = created.inspect_err(|_| {
            if !uploaded.is_empty() {
                tracing::warn!("Issue insert failed, orphaned uploads: {:?}", uploaded);
            }
        })?;

        tracing::info!(
            "Issue {} reported by {} for department {} ({} images)",
            issue.id,
            user.user_id,
            issue.department,
            issue.images.len()
        );

        self.get_issue(user, issue.id).await
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Apply a status/assignment/priority/estimate update under a row lock
    pub async fn update_issue(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        dto: UpdateIssueDto,
    ) -> Result<IssueResponseDto> {
        let request = dto.to_request();
        let mut tx = self.pool.begin().await?;

        let issue = Self::lock_issue(&mut tx, id).await?;

        if !policy::can_modify_issue(user, issue.scope()) {
            return Err(AppError::Forbidden(
                "You do not have permission to update this issue".to_string(),
            ));
        }

        lifecycle::authorize_update(user, &request)?;

        if let Some(expected) = dto.expected_version {
            if expected != issue.version {
                return Err(AppError::Conflict(format!(
                    "Issue was modified concurrently (expected version {}, current version {})",
                    expected, issue.version
                )));
            }
        }

        if let Some(assignee) = request.assigned_to {
            Self::check_assignee(&mut tx, assignee, &issue.department).await?;
        }

        let last_history = sqlx::query_as::<_, (IssueStatus, Uuid, Option<String>)>(
            r#"
            SELECT status, changed_by, comment
            FROM issue_history
            WHERE issue_id = $1
            ORDER BY changed_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .map(|(status, changed_by, comment)| LastHistory {
            status,
            changed_by,
            comment,
        });

        let changes = match lifecycle::plan_update(
            &issue,
            user.user_id,
            &request,
            last_history.as_ref(),
            Utc::now(),
        )? {
            UpdatePlan::NoOp => {
                tracing::debug!("Update of issue {} by {} changed nothing", id, user.user_id);
                tx.rollback().await?;
                return self.get_issue(user, id).await;
            }
            UpdatePlan::Apply(changes) => changes,
        };

        let updated = sqlx::query_as::<_, Issue>(&format!(
            r#"
            UPDATE issues AS i
            SET status = $2,
                assigned_to = $3,
                priority = $4,
                estimated_resolution_time = $5,
                actual_resolution_time = COALESCE(i.actual_resolution_time, $6),
                version = i.version + 1,
                updated_at = NOW()
            WHERE i.id = $1
            RETURNING {}
            "#,
            ISSUE_COLUMNS
        ))
        .bind(id)
        .bind(changes.status)
        .bind(changes.assigned_to)
        .bind(changes.priority)
        .bind(changes.estimated_resolution_time)
        .bind(changes.resolved_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update issue {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        append_history(
            &mut tx,
            id,
            changes.status,
            user.user_id,
            changes.history_comment.as_deref(),
        )
        .await?;

        if changes.resolved_at.is_some() {
            AnalyticsService::record(
                &mut tx,
                &AnalyticsEvent {
                    event_type: AnalyticsEventType::IssueResolved,
                    entity_id: id,
                    entity_type: AnalyticsEntityType::Issue,
                    metadata: AnalyticsMetadata {
                        category: Some(updated.category.to_string()),
                        department: Some(updated.department.clone()),
                        ward: Some(updated.ward.clone()),
                        priority: Some(updated.priority.to_string()),
                        resolution_time: updated.resolution_hours(),
                        ..Default::default()
                    },
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Issue {} updated by {}: {} -> {} (version {})",
            id,
            user.user_id,
            issue.status,
            updated.status,
            updated.version
        );

        self.get_issue(user, id).await
    }

    /// Assignee must be an active field worker of the issue's department
    async fn check_assignee(conn: &mut PgConnection, assignee: Uuid, department: &str) -> Result<()> {
        let row = sqlx::query_as::<_, AssigneeRow>(
            "SELECT role, is_active, department FROM users WHERE id = $1",
        )
        .bind(assignee)
        .fetch_optional(conn)
        .await?;

        if is_valid_assignee(row.as_ref(), department) {
            Ok(())
        } else {
            Err(AppError::BadRequest("Invalid assignee".to_string()))
        }
    }

    // =========================================================================
    // CITIZEN ACTIONS
    // =========================================================================

    /// Record the reporter's rating of a resolved or closed issue, once
    pub async fn provide_feedback(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        dto: FeedbackDto,
    ) -> Result<IssueResponseDto> {
        policy::authorize(user, Capability::ProvideFeedback)?;

        let mut tx = self.pool.begin().await?;
        let issue = Self::lock_issue(&mut tx, id).await?;

        if issue.reported_by != user.user_id {
            return Err(AppError::Forbidden(
                "Only the reporter can provide feedback".to_string(),
            ));
        }
        if !matches!(issue.status, IssueStatus::Resolved | IssueStatus::Closed) {
            return Err(AppError::BadRequest(
                "Feedback can only be given on resolved or closed issues".to_string(),
            ));
        }
        if issue.feedback_rating.is_some() {
            return Err(AppError::Conflict(
                "Feedback has already been provided".to_string(),
            ));
        }

        let comment = dto
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        sqlx::query(
            r#"
            UPDATE issues
            SET feedback_rating = $2, feedback_comment = $3, feedback_provided_at = NOW(),
                version = version + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(dto.rating)
        .bind(comment)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("Feedback {}/5 recorded on issue {}", dto.rating, id);
        self.get_issue(user, id).await
    }

    /// One upvote per citizen; repeats leave the count unchanged
    pub async fn upvote(&self, user: &AuthenticatedUser, id: Uuid) -> Result<UpvoteResponseDto> {
        policy::authorize(user, Capability::UpvoteIssue)?;

        let mut tx = self.pool.begin().await?;
        Self::lock_issue(&mut tx, id).await?;

        let inserted = sqlx::query(
            "INSERT INTO issue_upvotes (issue_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(user.user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        let upvotes: i32 = if inserted {
            sqlx::query_scalar(
                "UPDATE issues SET upvotes = upvotes + 1 WHERE id = $1 RETURNING upvotes",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_scalar("SELECT upvotes FROM issues WHERE id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?
        };

        tx.commit().await?;

        if inserted {
            tracing::info!("Issue {} upvoted by {}", id, user.user_id);
        }

        Ok(UpvoteResponseDto {
            upvotes,
            upvoted: inserted,
        })
    }
}

async fn append_history(
    conn: &mut PgConnection,
    issue_id: Uuid,
    status: IssueStatus,
    changed_by: Uuid,
    comment: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO issue_history (id, issue_id, status, changed_by, comment)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(issue_id)
    .bind(status)
    .bind(changed_by)
    .bind(comment)
    .execute(conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to append history for issue {}: {:?}", issue_id, e);
        AppError::Database(e)
    })?;

    Ok(())
}

/// Role scope plus the query filters the caller's role may use
pub fn push_list_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    user: &AuthenticatedUser,
    query: &IssueListQuery,
) {
    IssueListScope::for_user(user).push_conditions(qb);

    if let Some(status) = query.status {
        qb.push(" AND i.status = ").push_bind(status);
    }
    if let Some(category) = query.category {
        qb.push(" AND i.category = ").push_bind(category);
    }
    if let Some(priority) = query.priority {
        qb.push(" AND i.priority = ").push_bind(priority);
    }
    if let Some(department) = &query.department {
        if policy::may_filter_by_department(user.role) {
            qb.push(" AND i.department = ").push_bind(department.clone());
        }
    }
    if let Some(ward) = &query.ward {
        if policy::may_filter_by_ward(user.role) {
            qb.push(" AND i.ward = ").push_bind(ward.clone());
        }
    }
    if let Some(assigned_to) = query.assigned_to {
        if policy::may_filter_by_assignee(user.role) {
            qb.push(" AND i.assigned_to = ").push_bind(assigned_to);
        }
    }
}

/// Reporter details are shown for anonymous reports only to the reporter
/// and city-wide admins
fn reporter_visible(issue: &Issue, viewer: &AuthenticatedUser) -> bool {
    !issue.is_anonymous || issue.reported_by == viewer.user_id || viewer.is_city_wide()
}

fn to_response(row: IssueRow, viewer: &AuthenticatedUser) -> IssueResponseDto {
    let reported_by = reporter_visible(&row.issue, viewer).then(|| UserSummaryDto {
        id: row.issue.reported_by,
        name: row.reporter_name,
        email: row.reporter_email,
        phone: row.reporter_phone,
    });

    let assigned_to = match (row.issue.assigned_to, row.assignee_name, row.assignee_email) {
        (Some(id), Some(name), Some(email)) => Some(UserSummaryDto {
            id,
            name,
            email,
            phone: row.assignee_phone,
        }),
        _ => None,
    };

    IssueResponseDto::from_issue(row.issue, reported_by, assigned_to)
}
