use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::policy::IssueListScope;
use crate::features::dashboard::dtos::*;
use crate::features::issues::models::{IssueCategory, IssuePriority, IssueStatus};

#[derive(Debug, FromRow)]
struct SummaryRow {
    total_issues: i64,
    resolved_today: i64,
    average_resolution_hours: Option<f64>,
    average_rating: Option<f64>,
}

/// Service for role-scoped dashboard statistics
pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Totals, breakdowns and averages over the caller's list scope
    pub async fn get_stats(&self, user: &AuthenticatedUser) -> Result<DashboardStatsDto> {
        let scope = IssueListScope::for_user(user);

        let summary = async {
            scoped_query(
                r#"
                SELECT
                    COUNT(*) AS total_issues,
                    COUNT(*) FILTER (
                        WHERE i.actual_resolution_time >= date_trunc('day', NOW())
                    ) AS resolved_today,
                    (AVG(EXTRACT(EPOCH FROM (i.actual_resolution_time - i.created_at)))
                        / 3600.0)::float8 AS average_resolution_hours,
                    AVG(i.feedback_rating)::float8 AS average_rating
                FROM issues i
                WHERE TRUE
                "#,
                &scope,
                None,
            )
            .build_query_as::<SummaryRow>()
            .fetch_one(&self.pool)
            .await
        };

        let statuses = async {
            scoped_query("SELECT i.status, COUNT(*) FROM issues i WHERE TRUE", &scope, Some("i.status"))
                .build_query_as::<(IssueStatus, i64)>()
                .fetch_all(&self.pool)
                .await
        };

        let priorities = async {
            scoped_query(
                "SELECT i.priority, COUNT(*) FROM issues i WHERE TRUE",
                &scope,
                Some("i.priority"),
            )
            .build_query_as::<(IssuePriority, i64)>()
            .fetch_all(&self.pool)
            .await
        };

        let categories = async {
            scoped_query(
                "SELECT i.category, COUNT(*) FROM issues i WHERE TRUE",
                &scope,
                Some("i.category"),
            )
            .build_query_as::<(IssueCategory, i64)>()
            .fetch_all(&self.pool)
            .await
        };

        let (summary, statuses, priorities, categories) =
            futures::try_join!(summary, statuses, priorities, categories).map_err(|e| {
                tracing::error!("Failed to compute dashboard stats: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(DashboardStatsDto {
            total_issues: summary.total_issues,
            by_status: status_counts(&statuses),
            by_priority: priorities
                .into_iter()
                .map(|(priority, count)| PriorityCountDto { priority, count })
                .collect(),
            by_category: category_counts(categories),
            resolved_today: summary.resolved_today,
            average_resolution_hours: summary.average_resolution_hours,
            average_rating: summary.average_rating,
        })
    }
}

/// `select` (ending in a WHERE clause) narrowed to `scope`, optionally grouped
fn scoped_query(
    select: &str,
    scope: &IssueListScope,
    group_by: Option<&str>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(select);
    scope.push_conditions(&mut qb);
    if let Some(column) = group_by {
        qb.push(" GROUP BY ").push(column);
    }
    qb
}

/// One entry per status in lifecycle order, missing statuses counted as zero
fn status_counts(rows: &[(IssueStatus, i64)]) -> Vec<StatusCountDto> {
    IssueStatus::ALL
        .iter()
        .map(|status| StatusCountDto {
            status: *status,
            count: rows
                .iter()
                .find(|(s, _)| s == status)
                .map_or(0, |(_, count)| *count),
        })
        .collect()
}

fn category_counts(mut rows: Vec<(IssueCategory, i64)>) -> Vec<CategoryCountDto> {
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
    rows.into_iter()
        .map(|(category, count)| CategoryCountDto { category, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::users::models::UserRole;
    use crate::shared::test_helpers::user_with_role;

    #[test]
    fn test_status_counts_fill_missing_statuses() {
        let counts = status_counts(&[(IssueStatus::Resolved, 4), (IssueStatus::Pending, 2)]);

        assert_eq!(counts.len(), IssueStatus::ALL.len());
        assert_eq!(counts[0].status, IssueStatus::Pending);
        assert_eq!(counts[0].count, 2);
        let resolved = counts
            .iter()
            .find(|c| c.status == IssueStatus::Resolved)
            .unwrap();
        assert_eq!(resolved.count, 4);
        assert!(counts
            .iter()
            .filter(|c| !matches!(c.status, IssueStatus::Pending | IssueStatus::Resolved))
            .all(|c| c.count == 0));
    }

    #[test]
    fn test_category_counts_largest_first() {
        let counts = category_counts(vec![
            (IssueCategory::Traffic, 1),
            (IssueCategory::WaterSupply, 5),
            (IssueCategory::Drainage, 5),
        ]);

        let order: Vec<_> = counts.iter().map(|c| c.category).collect();
        assert_eq!(
            order,
            vec![
                IssueCategory::Drainage,
                IssueCategory::WaterSupply,
                IssueCategory::Traffic
            ]
        );
    }

    #[test]
    fn test_grouped_query_is_scoped() {
        let admin = user_with_role(UserRole::RegionalAdmin);
        let qb = scoped_query(
            "SELECT i.status, COUNT(*) FROM issues i WHERE TRUE",
            &IssueListScope::for_user(&admin),
            Some("i.status"),
        );

        assert_eq!(
            qb.sql(),
            "SELECT i.status, COUNT(*) FROM issues i WHERE TRUE AND i.ward = $1 GROUP BY i.status"
        );
    }
}
