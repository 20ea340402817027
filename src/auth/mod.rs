//! User registration, login and bearer tokens.
//!
//! Passwords are hashed with bcrypt on the blocking pool. Tokens are
//! HS256 JWTs whose `sub` is the user's email.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::{AppError, Result};
use crate::storage::UserStore;
use crate::types::{Credentials, Token, User, UserPublic};

/// Expiry used when none is configured.
const DEFAULT_EXPIRE_MINUTES: i64 = 15;

/// Verified against on a login for an unknown email, so that miss costs
/// the same bcrypt work as a wrong password.
const TIMING_DUMMY_PASSWORD: &str = "oraculo-timing-dummy";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserStore,
    secret_key: SecretString,
    expire: Duration,
    bcrypt_cost: u32,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(users: UserStore, config: &AuthConfig, secret_key: SecretString) -> Self {
        let dummy_hash = bcrypt::hash(TIMING_DUMMY_PASSWORD, config.bcrypt_cost)
            .unwrap_or_else(|e| {
                warn!(error = %e, cost = config.bcrypt_cost, "Invalid bcrypt cost");
                String::new()
            });

        Self {
            users,
            secret_key,
            expire: Duration::minutes(
                config.access_token_expire_minutes.unwrap_or(DEFAULT_EXPIRE_MINUTES),
            ),
            bcrypt_cost: config.bcrypt_cost,
            dummy_hash,
        }
    }

    /// Create a user. Fails with `EmailTaken` if the email is registered.
    pub async fn register(&self, credentials: Credentials) -> Result<UserPublic> {
        if self.users.find_by_email(&credentials.email).await?.is_some() {
            return Err(AppError::EmailTaken);
        }

        let hashed_password = hash_password(credentials.password, self.bcrypt_cost).await?;
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: credentials.email,
            hashed_password,
            is_active: true,
            created_at: Utc::now(),
        };

        match self.users.insert(&user).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(AppError::EmailTaken);
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, "User registered");
        Ok(user.into())
    }

    /// Verify credentials and issue a bearer token.
    pub async fn login(&self, credentials: Credentials) -> Result<Token> {
        let Some(user) = self.users.find_by_email(&credentials.email).await? else {
            verify_password(credentials.password, self.dummy_hash.clone()).await?;
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(credentials.password, user.hashed_password.clone()).await? {
            warn!(user_id = %user.id, "Login rejected: bad password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_access_token(&user.email)?;
        info!(user_id = %user.id, "Access token issued");
        Ok(Token::bearer(token))
    }

    pub fn create_access_token(&self, subject: &str) -> Result<String> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + self.expire).timestamp() as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret_key.expose_secret().as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Check signature and expiry of a token issued by this service.
    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret_key.expose_secret().as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidCredentials)
    }
}

async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::internal(format!("Hashing task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
}

async fn verify_password(password: String, hashed: String) -> Result<bool> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(|e| AppError::internal(format!("Hashing task failed: {e}")))?;
    // A malformed stored hash can never match.
    Ok(verified.unwrap_or(false))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
