use crate::{
    entities::user::{self, UserRole},
    errors::ServiceError,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// JWT claims issued at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Token issuance and validation plus password hashing.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: u64,
}

impl AuthService {
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs,
        }
    }

    /// Issue a token for a user. The claims mirror the login response payload
    /// so clients can render the session without a follow-up fetch.
    pub fn generate_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            iat: now,
            exp: now + self.expiration_secs as i64,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("token encoding failed: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ServiceError::AuthError("Invalid or expired token".to_string()))
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {}", e)))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| ServiceError::InternalError(format!("stored hash malformed: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Random hex token for e-mail verification links.
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn bearer_token(parts: &Parts) -> Result<String, ServiceError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::AuthError("No token provided".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| ServiceError::AuthError("Malformed authorization header".to_string()))
}

/// Extractor for handlers that require a valid session. The `AuthService`
/// is injected into request extensions by a middleware layer at startup.
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| {
                ServiceError::InternalError("AuthService missing from request extensions".into())
            })?;

        let token = bearer_token(parts)?;
        let claims = auth.validate_token(&token)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Extractor for admin-only routes.
pub struct AdminUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only admins can access this route".to_string(),
            ));
        }
        Ok(AdminUser(claims))
    }
}
