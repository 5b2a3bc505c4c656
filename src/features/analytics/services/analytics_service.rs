use sqlx::PgConnection;

use crate::core::error::{AppError, Result};
use crate::features::analytics::models::AnalyticsEvent;

/// Write-only sink for analytics events. Callers pass the connection of the
/// transaction that performs the change being recorded.
pub struct AnalyticsService;

impl AnalyticsService {
    pub async fn record(conn: &mut PgConnection, event: &AnalyticsEvent) -> Result<()> {
        let metadata = serde_json::to_value(&event.metadata)
            .map_err(|e| AppError::Internal(format!("Failed to encode analytics metadata: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO analytics_events (event_type, entity_id, entity_type, metadata)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(event.event_type)
        .bind(event.entity_id)
        .bind(event.entity_type)
        .bind(metadata)
        .execute(conn)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to record {:?} event for {}: {:?}",
                event.event_type,
                event.entity_id,
                e
            );
            AppError::Database(e)
        })?;

        Ok(())
    }
}
