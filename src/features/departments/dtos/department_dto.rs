use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::departments::models::{Department, DepartmentCategory};
use crate::features::users::dtos::UserSummaryDto;

/// Request DTO for creating a department
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDepartmentDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 500, message = "Description must be 1-500 characters"))]
    pub description: String,

    #[validate(length(min = 1, message = "At least one category is required"))]
    pub categories: Vec<DepartmentCategory>,

    /// Must reference an existing department admin
    pub head_id: Uuid,

    #[validate(email(message = "Please enter a valid contact email"))]
    pub contact_email: String,

    #[validate(regex(
        path = *crate::shared::validation::PHONE_REGEX,
        message = "Please enter a valid phone number"
    ))]
    pub contact_phone: Option<String>,
}

/// Response DTO for a department
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepartmentResponseDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub categories: Vec<DepartmentCategory>,
    /// `None` only if the head account no longer exists
    pub head: Option<UserSummaryDto>,
    /// Active field workers whose department is this one
    pub workers: Vec<UserSummaryDto>,
    pub contact_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DepartmentResponseDto {
    pub fn new(
        department: Department,
        head: Option<UserSummaryDto>,
        workers: Vec<UserSummaryDto>,
    ) -> Self {
        Self {
            id: department.id,
            name: department.name,
            description: department.description,
            categories: department.categories,
            head,
            workers,
            contact_email: department.contact_email,
            contact_phone: department.contact_phone,
            is_active: department.is_active,
            created_at: department.created_at,
            updated_at: department.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::validation::field_messages;
    use fake::faker::internet::en::SafeEmail;
    use fake::Fake;

    fn dto() -> CreateDepartmentDto {
        CreateDepartmentDto {
            name: "Sanitation".to_string(),
            description: "Waste collection and drainage".to_string(),
            categories: vec![DepartmentCategory::Sanitation],
            head_id: Uuid::new_v4(),
            contact_email: SafeEmail().fake(),
            contact_phone: None,
        }
    }

    #[test]
    fn test_valid_department() {
        assert!(dto().validate().is_ok());
    }

    #[test]
    fn test_department_requires_categories_and_contact() {
        let mut invalid = dto();
        invalid.categories.clear();
        invalid.contact_email = "not-an-email".to_string();
        invalid.contact_phone = Some("call me".to_string());

        let messages = field_messages(&invalid.validate().unwrap_err());
        assert_eq!(
            messages,
            vec![
                "categories: At least one category is required".to_string(),
                "contact_email: Please enter a valid contact email".to_string(),
                "contact_phone: Please enter a valid phone number".to_string(),
            ]
        );
    }

    #[test]
    fn test_category_wire_names() {
        let dto: CreateDepartmentDto = serde_json::from_value(serde_json::json!({
            "name": "Roads",
            "description": "Roads and bridges",
            "categories": ["infrastructure", "traffic"],
            "head_id": Uuid::new_v4(),
            "contact_email": "roads@civiclink.test"
        }))
        .unwrap();

        assert_eq!(
            dto.categories,
            vec![DepartmentCategory::Infrastructure, DepartmentCategory::Traffic]
        );
    }
}
