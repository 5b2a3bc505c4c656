use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use std::time::Duration;

use crate::core::config::AuthConfig;
use crate::core::error::{AppError, Result};
use crate::features::auth::model::{AuthenticatedUser, Claims};
use crate::features::users::models::User;

/// Issues and validates HS256 access tokens signed with the shared secret
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    leeway: u64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: config.token_ttl,
            leeway: config.jwt_leeway.as_secs(),
        }
    }

    /// Token lifetime in seconds, reported to clients alongside the token
    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            department: user.department.clone(),
            ward: user.ward.clone(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };

        self.encode_claims(&claims)
    }

    pub fn encode_claims(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign access token: {}", e);
            AppError::Internal("Failed to sign access token".to_string())
        })
    }

    /// Verify signature and expiry, returning the raw payload
    pub fn decode_claims(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Token has expired".to_string())
                }
                _ => {
                    tracing::debug!("Rejected access token: {}", e);
                    AppError::Unauthorized("Invalid token".to_string())
                }
            })
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser> {
        self.decode_claims(token).map(AuthenticatedUser::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::users::models::UserRole;
    use crate::shared::test_helpers::test_token_service;
    use uuid::Uuid;

    fn sample_user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Dana Field".to_string(),
            email: "dana@civiclink.test".to_string(),
            password_hash: "unused".to_string(),
            role,
            phone: None,
            address: None,
            department: Some("Sanitation".to_string()),
            ward: None,
            profile_image: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let tokens = test_token_service();
        let user = sample_user(UserRole::FieldWorker);

        let token = tokens.issue_token(&user).unwrap();
        let authenticated = tokens.validate_token(&token).unwrap();

        assert_eq!(authenticated.user_id, user.id);
        assert_eq!(authenticated.role, UserRole::FieldWorker);
        assert_eq!(authenticated.department.as_deref(), Some("Sanitation"));
        assert_eq!(authenticated.ward, None);
    }

    #[test]
    fn test_payload_uses_user_id_key() {
        let tokens = test_token_service();
        let token = tokens.issue_token(&sample_user(UserRole::Citizen)).unwrap();
        let claims = tokens.decode_claims(&token).unwrap();

        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("userId").is_some());
        assert_eq!(json["role"], "citizen");
        assert!(json.get("ward").is_none());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = test_token_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: Uuid::new_v4(),
            email: "late@civiclink.test".to_string(),
            role: UserRole::Citizen,
            department: None,
            ward: None,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = tokens.encode_claims(&claims).unwrap();

        match tokens.validate_token(&token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token has expired"),
            other => panic!("expected expiry rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_token_rejected() {
        let tokens = test_token_service();
        let token = tokens.issue_token(&sample_user(UserRole::Citizen)).unwrap();

        let mut forged = token.clone();
        forged.push('x');
        assert!(matches!(
            tokens.validate_token(&forged),
            Err(AppError::Unauthorized(_))
        ));
        assert!(tokens.validate_token("not-a-token").is_err());
    }

    #[test]
    fn test_other_secret_rejected() {
        let mut config = crate::shared::test_helpers::test_auth_config();
        config.jwt_secret = "a-completely-different-signing-secret".to_string();
        let foreign = TokenService::new(&config);
        let token = foreign.issue_token(&sample_user(UserRole::SuperAdmin)).unwrap();

        assert!(test_token_service().validate_token(&token).is_err());
    }
}
