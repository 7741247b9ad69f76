use chrono::Duration;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AppError, AuthError};

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject of the token: the username it was issued to.
    pub sub: String,
    /// Issue timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch). The token is invalid from this second on.
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
///
/// Validity depends only on the signature and the embedded expiry, so any
/// instance built from the same `AuthConfig` accepts tokens issued by any other.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let secret = config.jwt_secret.as_bytes();

        // Expiry is checked against `clock` below, without jsonwebtoken's default leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: config.token_ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generates a token for `subject`, valid from now until now + TTL.
    pub fn generate(&self, subject: &str) -> Result<String, AppError> {
        if subject.is_empty() {
            return Err(AppError::InternalServerError(
                "Refusing to issue a token without a subject".into(),
            ));
        }

        let issued_at = self.clock.now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at,
            exp: issued_at + self.ttl.num_seconds(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verifies the signature and expiry of `token` and returns its claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let kind = classify(e.kind());
                log::debug!("Rejected token: {} ({})", kind, e);
                kind
            })?;

        if claims.sub.is_empty() {
            return Err(AuthError::Malformed);
        }
        if self.clock.now().timestamp() >= claims.exp {
            log::debug!("Rejected token for '{}': expired", claims.sub);
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// Validates `token` and returns the subject it was issued to.
    pub fn validate(&self, token: &str) -> Result<String, AuthError> {
        self.decode(token).map(|claims| claims.sub)
    }
}

fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Malformed,
    }
}
