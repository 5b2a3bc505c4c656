use std::collections::HashMap;

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::core::database::is_unique_violation;
use crate::core::error::{AppError, Result};
use crate::features::analytics::models::{
    AnalyticsEntityType, AnalyticsEvent, AnalyticsEventType, AnalyticsMetadata,
};
use crate::features::analytics::AnalyticsService;
use crate::features::departments::dtos::{CreateDepartmentDto, DepartmentResponseDto};
use crate::features::departments::models::{Department, DepartmentCategory};
use crate::features::users::dtos::UserSummaryDto;
use crate::features::users::models::UserRole;

const DEPARTMENT_COLUMNS: &str = "id, name, description, categories, head_id, contact_email, \
     contact_phone, is_active, created_at, updated_at";

const NAME_CONSTRAINT: &str = "departments_name_key";

/// Head or worker as shown on a department
#[derive(Debug, FromRow)]
struct PersonRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    department: Option<String>,
}

impl From<PersonRow> for UserSummaryDto {
    fn from(row: PersonRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
        }
    }
}

pub struct DepartmentService {
    pool: PgPool,
}

impl DepartmentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active departments by name, each with its head and worker list
    pub async fn list_departments(&self) -> Result<Vec<DepartmentResponseDto>> {
        let departments = sqlx::query_as::<_, Department>(&format!(
            "SELECT {} FROM departments WHERE is_active = TRUE ORDER BY name ASC",
            DEPARTMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list departments: {:?}", e);
            AppError::Database(e)
        })?;

        self.with_people(departments).await
    }

    pub async fn get_department(&self, id: Uuid) -> Result<DepartmentResponseDto> {
        let department = sqlx::query_as::<_, Department>(&format!(
            "SELECT {} FROM departments WHERE id = $1",
            DEPARTMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;

        self.with_people(vec![department])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Department lost while loading".to_string()))
    }

    /// Create a department headed by an existing department admin
    pub async fn create_department(&self, dto: CreateDepartmentDto) -> Result<DepartmentResponseDto> {
        let name = dto.name.trim().to_string();

        let head_role: Option<UserRole> =
            sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
                .bind(dto.head_id)
                .fetch_optional(&self.pool)
                .await?;

        if head_role != Some(UserRole::DepartmentAdmin) {
            return Err(AppError::BadRequest(
                "Department head must be an existing department admin".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let department = sqlx::query_as::<_, Department>(&format!(
            r#"
            INSERT INTO departments (name, description, categories, head_id, contact_email, contact_phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            DEPARTMENT_COLUMNS
        ))
        .bind(&name)
        .bind(dto.description.trim())
        .bind(&dto.categories)
        .bind(dto.head_id)
        .bind(dto.contact_email.trim().to_lowercase())
        .bind(dto.contact_phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, NAME_CONSTRAINT) {
                AppError::BadRequest("Department with this name already exists".to_string())
            } else {
                tracing::error!("Failed to create department: {:?}", e);
                AppError::Database(e)
            }
        })?;

        AnalyticsService::record(
            &mut tx,
            &AnalyticsEvent {
                event_type: AnalyticsEventType::DepartmentActivity,
                entity_id: department.id,
                entity_type: AnalyticsEntityType::Department,
                metadata: AnalyticsMetadata {
                    department: Some(department.name.clone()),
                    ..Default::default()
                },
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!("Department '{}' created with id {}", department.name, department.id);
        self.get_department(department.id).await
    }

    /// Name of the oldest active department handling `category`
    pub async fn department_for_category(
        pool: &PgPool,
        category: DepartmentCategory,
    ) -> Result<Option<String>> {
        let name: Option<String> = sqlx::query_scalar(
            r#"
            SELECT name FROM departments
            WHERE is_active = TRUE AND $1 = ANY(categories)
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(category)
        .fetch_optional(pool)
        .await?;

        Ok(name)
    }

    /// Attach heads and derived worker lists in two queries
    async fn with_people(&self, departments: Vec<Department>) -> Result<Vec<DepartmentResponseDto>> {
        if departments.is_empty() {
            return Ok(Vec::new());
        }

        let head_ids: Vec<Uuid> = departments.iter().map(|d| d.head_id).collect();
        let names: Vec<String> = departments.iter().map(|d| d.name.clone()).collect();

        let heads: HashMap<Uuid, UserSummaryDto> = sqlx::query_as::<_, PersonRow>(
            "SELECT id, name, email, phone, department FROM users WHERE id = ANY($1)",
        )
        .bind(&head_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| (row.id, row.into()))
        .collect();

        let worker_rows = sqlx::query_as::<_, PersonRow>(
            r#"
            SELECT id, name, email, phone, department FROM users
            WHERE role = 'field_worker' AND is_active = TRUE AND department = ANY($1)
            ORDER BY name ASC
            "#,
        )
        .bind(&names)
        .fetch_all(&self.pool)
        .await?;

        let mut workers: HashMap<String, Vec<UserSummaryDto>> = HashMap::new();
        for row in worker_rows {
            if let Some(department) = row.department.clone() {
                workers.entry(department).or_default().push(row.into());
            }
        }

        Ok(departments
            .into_iter()
            .map(|department| {
                let head = heads.get(&department.head_id).cloned();
                let staff = workers.remove(&department.name).unwrap_or_default();
                DepartmentResponseDto::new(department, head, staff)
            })
            .collect())
    }
}
