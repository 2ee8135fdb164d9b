use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub admin: bool,
    pub exp: i64, // Expiration time as Unix timestamp
    pub iat: i64, // Issued at time as Unix timestamp
}

/// JWT authentication service
#[derive(Clone)]
pub struct AuthService {
    secret: String,
    expiration_hours: i64,
}

impl AuthService {
    pub fn new(secret: String, expiration_hours: i64) -> Self {
        Self {
            secret,
            expiration_hours,
        }
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user_id: &str, email: &str, admin: bool) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.expiration_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            admin,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate a JWT token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_and_validation() {
        let auth_service = AuthService::new("test_secret_key".to_string(), 24);

        let token = auth_service
            .generate_token("65f0a1b2c3d4e5f6a7b8c9d0", "chef@savora.test", true)
            .expect("Failed to generate token");

        let claims = auth_service
            .validate_token(&token)
            .expect("Failed to validate token");

        assert_eq!(claims.sub, "65f0a1b2c3d4e5f6a7b8c9d0");
        assert_eq!(claims.email, "chef@savora.test");
        assert!(claims.admin);
    }

    #[test]
    fn test_invalid_token_validation() {
        let auth_service = AuthService::new("test_secret_key".to_string(), 24);

        let result = auth_service.validate_token("invalid_token");
        assert!(result.is_err());
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let issuer = AuthService::new("secret_one".to_string(), 24);
        let verifier = AuthService::new("secret_two".to_string(), 24);

        let token = issuer
            .generate_token("65f0a1b2c3d4e5f6a7b8c9d0", "chef@savora.test", false)
            .expect("Failed to generate token");

        assert!(verifier.validate_token(&token).is_err());
    }
}
