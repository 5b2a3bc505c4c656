use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::issues::lifecycle::UpdateRequest;
use crate::features::issues::models::{
    Issue, IssueCategory, IssueHistoryEntry, IssuePriority, IssueStatus,
};
use crate::features::users::dtos::UserSummaryDto;
use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_ISSUE_IMAGES};
use crate::shared::types::PaginationQuery;

// `validator` length bounds are u64.
const MAX_ISSUE_IMAGES_U64: u64 = MAX_ISSUE_IMAGES as u64;

// =============================================================================
// LOCATION & CONTACT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CoordinatesDto {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LocationDto {
    #[validate(length(min = 1, max = 300, message = "Address is required"))]
    pub address: String,
    #[validate(nested)]
    pub coordinates: CoordinatesDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ContactInfoDto {
    #[validate(regex(
        path = *crate::shared::validation::PHONE_REGEX,
        message = "Please enter a valid phone number"
    ))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[validate(length(max = 50, message = "Preferred contact must not exceed 50 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_contact: Option<String>,
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Request DTO for reporting an issue
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateIssueDto {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: String,

    pub category: IssueCategory,

    #[serde(default)]
    pub priority: IssuePriority,

    #[validate(nested)]
    pub location: LocationDto,

    /// Handling department; inferred from the category when omitted
    #[validate(length(min = 1, max = 100, message = "Department must be 1-100 characters"))]
    pub department: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Ward is required"))]
    pub ward: String,

    /// Already-hosted image URLs; uploaded files are appended
    #[serde(default)]
    #[validate(length(max = MAX_ISSUE_IMAGES_U64, message = "Too many images"))]
    pub images: Vec<String>,

    #[validate(nested)]
    pub contact_info: Option<ContactInfoDto>,

    #[serde(default)]
    pub is_anonymous: bool,
}

/// Multipart form for reporting an issue with photos (OpenAPI documentation only).
/// The handler reads the parts with axum's Multipart extractor.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreateIssueMultipartDto {
    /// `CreateIssueDto` serialized as JSON
    pub data: String,
    /// Repeatable image part (jpeg, png, webp or gif)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub images: Vec<String>,
}

/// Request DTO for updating an issue
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateIssueDto {
    pub status: Option<IssueStatus>,
    /// Field worker to assign
    pub assigned_to: Option<Uuid>,
    pub priority: Option<IssuePriority>,
    pub estimated_resolution_time: Option<DateTime<Utc>>,
    #[validate(length(max = 500, message = "Comment must not exceed 500 characters"))]
    pub comment: Option<String>,
    /// Reject the update with 409 unless the issue is still at this version
    pub expected_version: Option<i32>,
}

impl UpdateIssueDto {
    pub fn to_request(&self) -> UpdateRequest {
        UpdateRequest {
            status: self.status,
            assigned_to: self.assigned_to,
            priority: self.priority,
            estimated_resolution_time: self.estimated_resolution_time,
            comment: self.comment.clone(),
        }
    }
}

/// Request DTO for reporter feedback on a resolved issue
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct FeedbackDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 1000, message = "Feedback comment must not exceed 1000 characters"))]
    pub comment: Option<String>,
}

/// Query params for listing issues
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct IssueListQuery {
    pub status: Option<IssueStatus>,
    pub category: Option<IssueCategory>,
    pub priority: Option<IssuePriority>,
    /// Only honoured for city and super admins
    pub department: Option<String>,
    /// Only honoured for city, super and regional admins
    pub ward: Option<String>,
    /// Only honoured for department, city and super admins
    pub assigned_to: Option<Uuid>,
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page; `limit` is accepted as an alias
    #[serde(default = "default_page_size", alias = "limit")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl IssueListQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeedbackResponseDto {
    pub rating: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub provided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntryDto {
    pub status: IssueStatus,
    pub changed_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_by_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl From<IssueHistoryEntry> for HistoryEntryDto {
    fn from(entry: IssueHistoryEntry) -> Self {
        Self {
            status: entry.status,
            changed_by: entry.changed_by,
            changed_by_name: entry.changed_by_name,
            comment: entry.comment,
            changed_at: entry.changed_at,
        }
    }
}

/// Response DTO for an issue
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueResponseDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    pub status: IssueStatus,
    /// Absent for anonymous reports unless the viewer is the reporter or a city-wide admin
    pub reported_by: Option<UserSummaryDto>,
    pub assigned_to: Option<UserSummaryDto>,
    pub department: String,
    pub location: LocationDto,
    pub images: Vec<String>,
    pub estimated_resolution_time: Option<DateTime<Utc>>,
    pub actual_resolution_time: Option<DateTime<Utc>>,
    pub feedback: Option<FeedbackResponseDto>,
    pub upvotes: i32,
    pub ward: String,
    pub contact_info: Option<ContactInfoDto>,
    pub is_anonymous: bool,
    pub version: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntryDto>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssueResponseDto {
    pub fn from_issue(
        issue: Issue,
        reported_by: Option<UserSummaryDto>,
        assigned_to: Option<UserSummaryDto>,
    ) -> Self {
        let feedback = match (issue.feedback_rating, issue.feedback_provided_at) {
            (Some(rating), Some(provided_at)) => Some(FeedbackResponseDto {
                rating,
                comment: issue.feedback_comment,
                provided_at,
            }),
            _ => None,
        };

        let contact_info = (issue.contact_phone.is_some() || issue.preferred_contact.is_some())
            .then(|| ContactInfoDto {
                phone: issue.contact_phone,
                preferred_contact: issue.preferred_contact,
            });

        Self {
            id: issue.id,
            title: issue.title,
            description: issue.description,
            category: issue.category,
            priority: issue.priority,
            status: issue.status,
            reported_by,
            assigned_to,
            department: issue.department,
            location: LocationDto {
                address: issue.address,
                coordinates: CoordinatesDto {
                    latitude: issue.latitude,
                    longitude: issue.longitude,
                },
            },
            images: issue.images,
            estimated_resolution_time: issue.estimated_resolution_time,
            actual_resolution_time: issue.actual_resolution_time,
            feedback,
            upvotes: issue.upvotes,
            ward: issue.ward,
            contact_info,
            is_anonymous: issue.is_anonymous,
            version: issue.version,
            history: None,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpvoteResponseDto {
    pub upvotes: i32,
    /// False when this user had already upvoted
    pub upvoted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::validation::field_messages;

    fn create_json() -> serde_json::Value {
        serde_json::json!({
            "title": "Streetlight out",
            "description": "The light at the corner has been out for a week",
            "category": "street_lighting",
            "location": {
                "address": "4 Elm Rd",
                "coordinates": {"latitude": 12.9, "longitude": 77.6}
            },
            "ward": "Ward 1"
        })
    }

    #[test]
    fn test_create_defaults() {
        let dto: CreateIssueDto = serde_json::from_value(create_json()).unwrap();
        assert_eq!(dto.priority, IssuePriority::Medium);
        assert!(!dto.is_anonymous);
        assert!(dto.images.is_empty());
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_rejects_out_of_range_coordinates() {
        let mut json = create_json();
        json["location"]["coordinates"]["latitude"] = 91.0.into();
        json["location"]["coordinates"]["longitude"] = (-181.0).into();
        let dto: CreateIssueDto = serde_json::from_value(json).unwrap();

        let messages = field_messages(&dto.validate().unwrap_err());
        assert_eq!(
            messages,
            vec![
                "location.coordinates.latitude: Latitude must be between -90 and 90".to_string(),
                "location.coordinates.longitude: Longitude must be between -180 and 180"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_update_comment_limit() {
        let dto = UpdateIssueDto {
            comment: Some("x".repeat(501)),
            ..Default::default()
        };
        assert!(dto.validate().is_err());

        let dto = UpdateIssueDto {
            comment: Some("x".repeat(500)),
            ..Default::default()
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_feedback_rating_bounds() {
        for (rating, ok) in [(0, false), (1, true), (5, true), (6, false)] {
            let dto = FeedbackDto {
                rating,
                comment: None,
            };
            assert_eq!(dto.validate().is_ok(), ok, "rating {}", rating);
        }
    }
}
