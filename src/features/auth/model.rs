use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::auth::policy::{self, Capability};
use crate::features::users::models::UserRole;

/// Identity carried by a validated access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
}

impl AuthenticatedUser {
    /// Check if the user's role grants a capability
    pub fn can(&self, capability: Capability) -> bool {
        policy::role_has(self.role, capability)
    }

    pub fn is_city_wide(&self) -> bool {
        self.role.is_city_wide()
    }
}

/// Access token payload. Field names are part of the wire contract.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
            department: claims.department,
            ward: claims.ward,
        }
    }
}
