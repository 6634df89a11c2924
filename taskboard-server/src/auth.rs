//! Credential service and bearer-token verification.
//!
//! Passwords are stored as bcrypt hashes. Sessions are HS256 JWTs carrying
//! `{userId, username}` with a fixed expiry; nothing about a session is
//! kept server-side, so a token stays valid until it expires.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use taskboard_proto::auth::{AuthResponse, Credentials, UserInfo};

use crate::api::AppState;
use crate::error::ApiError;

/// The authenticated caller, attached to request extensions by
/// [`require_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// JWT payload.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: i64,
    username: String,
    iat: i64,
    exp: i64,
}

/// Signing and verification keys for session tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    /// Builds HS256 keys from a shared secret.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issues a token for `user` valid from now for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn issue(&self, user: &UserInfo) -> Result<String, ApiError> {
        self.issue_at(user, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn issue_at(&self, user: &UserInfo, now: DateTime<Utc>) -> Result<String, ApiError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            user_id: user.id,
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: now.timestamp().saturating_add(ttl),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Checks signature and expiry and returns the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for any invalid token.
    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token verification failed");
                ApiError::Unauthorized("invalid token")
            })?;
        if data.claims.user_id <= 0 {
            return Err(ApiError::Unauthorized("no user id in token"));
        }
        Ok(AuthUser {
            id: data.claims.user_id,
            username: data.claims.username,
        })
    }
}

// ---------------------------------------------------------------------------
// Credential service
// ---------------------------------------------------------------------------

/// Creates an account and signs the caller in.
///
/// # Errors
///
/// [`ApiError::Validation`] for an empty username or password,
/// [`ApiError::Conflict`] if the username is taken.
pub async fn register(state: &AppState, creds: Credentials) -> Result<AuthResponse, ApiError> {
    let (username, password) = normalize(creds)?;
    if state.store.find_user(&username)?.is_some() {
        return Err(ApiError::Conflict);
    }

    let cost = state.bcrypt_cost;
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    // The unique index still guards against a concurrent registration.
    let record = state.store.insert_user(&username, &hash)?;
    let user = UserInfo {
        id: record.id,
        username: record.username,
    };
    let token = state.keys.issue(&user)?;
    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(AuthResponse { token, user })
}

/// Verifies a username / password pair and signs the caller in.
///
/// # Errors
///
/// [`ApiError::InvalidCredentials`] for an unknown user or wrong password.
pub async fn login(state: &AppState, creds: Credentials) -> Result<AuthResponse, ApiError> {
    let (username, password) = normalize(creds)?;
    let record = state.store.find_user(&username)?;

    let hash = record.as_ref().map(|r| r.password_hash.clone());
    let cost = state.bcrypt_cost;
    let valid = tokio::task::spawn_blocking(move || check_password(&password, hash.as_deref(), cost))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("password check failed: {e}")))?;
    let Some(record) = record.filter(|_| valid) else {
        tracing::info!(username = %username, "login rejected");
        return Err(ApiError::InvalidCredentials);
    };

    let user = UserInfo {
        id: record.id,
        username: record.username,
    };
    let token = state.keys.issue(&user)?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok(AuthResponse { token, user })
}

/// Checks `password` against `hash`. Without a stored hash the password is
/// hashed anyway, so an unknown username costs as much as a wrong password.
fn check_password(password: &str, hash: Option<&str>, cost: u32) -> bcrypt::BcryptResult<bool> {
    match hash {
        Some(hash) => bcrypt::verify(password, hash),
        None => bcrypt::hash(password, cost).map(|_| false),
    }
}

fn normalize(creds: Credentials) -> Result<(String, String), ApiError> {
    let username = creds.username.trim().to_string();
    if username.is_empty() || creds.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".to_string(),
        ));
    }
    Ok((username, creds.password))
}

// ---------------------------------------------------------------------------
// Token verification middleware
// ---------------------------------------------------------------------------

/// Rejects requests without a valid bearer token; otherwise attaches the
/// [`AuthUser`] to the request and passes it on.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`], rendered as 401, before any handler
/// runs.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;
    let user = state.keys.verify(token)?;
    tracing::debug!(user_id = user.id, "request authenticated");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::Unauthorized("no token provided"))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("malformed authorization header"))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized("no token provided"))?;
    Ok(token)
}
