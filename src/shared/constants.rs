/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// ISSUE LIMITS
// =============================================================================

/// Maximum number of images attached to a single issue
pub const MAX_ISSUE_IMAGES: usize = 10;

/// Maximum size of a single uploaded image
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// MIME types accepted for issue images
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// History comment recorded when a citizen files an issue
pub const ISSUE_CREATED_COMMENT: &str = "Issue created";
