use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lingualink_common::{AppError, JwtConfig, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        name: String,
        email: String,
        role: UserRole,
        config: &JwtConfig,
    ) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(config.expiration_hours as i64);

        Self {
            sub: user_id.to_string(),
            name,
            email,
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Authentication("Invalid user ID in token".to_string()))
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    pub fn generate_token(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Authentication(format!("Failed to generate token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 24,
            issuer: "lingualink-test".to_string(),
        }
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let config = test_config();
        let service = JwtService::new(&config.secret);
        let user_id = Uuid::new_v4();

        let claims = Claims::new(
            user_id,
            "Ana".to_string(),
            "ana@example.com".to_string(),
            UserRole::Student,
            &config,
        );

        let token = service.generate_token(&claims).unwrap();
        let decoded = service.validate_token(&token).unwrap();

        assert_eq!(decoded.user_id().unwrap(), user_id);
        assert_eq!(decoded.email, "ana@example.com");
        assert_eq!(decoded.role, UserRole::Student);
        assert_eq!(decoded.iss, "lingualink-test");
    }

    #[test]
    fn tokens_signed_with_other_secrets_are_rejected() {
        let config = test_config();
        let claims = Claims::new(
            Uuid::new_v4(),
            "Ana".to_string(),
            "ana@example.com".to_string(),
            UserRole::Teacher,
            &config,
        );

        let token = JwtService::new("other-secret").generate_token(&claims).unwrap();
        assert!(JwtService::new(&config.secret).validate_token(&token).is_err());
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let service = JwtService::new("test-secret");
        assert!(service.validate_token("not-a-jwt").is_err());
    }
}
