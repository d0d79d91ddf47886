//! JWT validation with typed failure classification.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use pulse_core::config::auth::AuthConfig;

use super::claims::Claims;
use crate::error::AuthError;

/// Validates gateway credentials (HMAC-SHA256 JWTs).
#[derive(Clone)]
pub struct TokenVerifier {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a credential string.
    ///
    /// Checks signature validity and expiration, and classifies failures so
    /// the admission gate can surface distinct reason codes.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    ErrorKind::InvalidToken | ErrorKind::InvalidSignature => {
                        AuthError::Invalid(e.to_string())
                    }
                    ErrorKind::Base64(_) | ErrorKind::Json(_) => AuthError::Invalid(e.to_string()),
                    _ => AuthError::Internal(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::issuer::TokenIssuer;
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_minutes: 60,
            leeway_seconds: 5,
        }
    }

    #[test]
    fn test_verify_valid_token() {
        let cfg = config();
        let identity = Uuid::new_v4();
        let token = TokenIssuer::new(&cfg).issue(identity).unwrap();

        let claims = TokenVerifier::new(&cfg).verify(&token).unwrap();
        assert_eq!(claims.identity(), identity);
    }

    #[test]
    fn test_verify_expired_token() {
        let cfg = config();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: now - 3600,
            exp: now - 120,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
        )
        .unwrap();

        let err = TokenVerifier::new(&cfg).verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[test]
    fn test_verify_garbage_token() {
        let err = TokenVerifier::new(&config())
            .verify("not-a-token")
            .unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let identity = Uuid::new_v4();
        let token = TokenIssuer::new(&config()).issue(identity).unwrap();

        let mut other = config();
        other.jwt_secret = "different-secret".to_string();
        let err = TokenVerifier::new(&other).verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
    }
}
