use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use habify_db::Database;
use habify_db::models::NewUser;
use habify_engine::ResubmitPolicy;
use habify_types::api::{
    Claims, CsrfResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
    MessageResponse, RegisterRequest, ResetPasswordRequest, SessionResponse,
};

use crate::blocking;
use crate::clock::Clock;
use crate::error::ApiError;

const MIN_PASSWORD_LEN: usize = 6;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Lifetime of a session token.
    pub token_ttl: chrono::Duration,
    /// Lifetime of a password reset token.
    pub reset_ttl: chrono::Duration,
    /// Base URL of the web client, used to build reset links.
    pub public_url: String,
    pub resubmit_policy: ResubmitPolicy,
    pub clock: Arc<dyn Clock>,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    // Validate input
    let username = req.username.trim().to_string();
    let username_len = username.chars().count();
    if !(3..=32).contains(&username_len) {
        return Err(ApiError::validation("Username must be 3 to 32 characters"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    let email = req
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    let user_id = Uuid::new_v4();
    let registered_on = state.clock.today();

    let record = {
        let username = username.clone();
        let email = email.clone();
        let password = req.password.clone();
        let first_name = req.first_name.clone();
        let last_name = req.last_name.clone();
        let id = user_id.to_string();
        blocking(&state, move |db| {
            if db.get_user_by_username(&username)?.is_some() {
                return Ok(Err("Username already exists"));
            }
            if let Some(email) = email.as_deref() {
                if db.get_user_by_email(email)?.is_some() {
                    return Ok(Err("Email address already exists"));
                }
            }
            let password_hash = hash_password(&password)?;
            db.create_user(
                &NewUser {
                    id: &id,
                    username: &username,
                    email: email.as_deref(),
                    first_name: &first_name,
                    last_name: &last_name,
                    password_hash: &password_hash,
                },
                registered_on,
            )?;
            Ok(Ok(()))
        })
        .await?
    };
    record.map_err(ApiError::validation)?;

    info!("Registered user {} ({})", username, user_id);
    let token = create_token(&state, user_id, &username)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            success: true,
            id: user_id,
            username,
            first_name: req.first_name,
            last_name: req.last_name,
            email: email.unwrap_or_default(),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Json(req) = payload?;
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let password = req.password;
    let user = blocking(&state, move |db| {
        let Some(user) = db.get_user_by_username(&username)? else {
            return Ok(None);
        };
        // Verify password
        let parsed_hash = PasswordHash::new(&user.password).map_err(|e| anyhow::anyhow!("{e}"))?;
        let verified = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();
        Ok(verified.then_some(user))
    })
    .await?
    .ok_or(ApiError::InvalidCredentials)?;

    let user_id: Uuid = user.id.parse().map_err(|e| ApiError::Internal(anyhow::Error::from(e)))?;
    let token = create_token(&state, user_id, &user.username)?;

    debug!("User {} logged in", user.username);
    Ok(Json(SessionResponse {
        success: true,
        id: user_id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email.unwrap_or_default(),
        token,
    }))
}

/// Revokes the presented token. Other sessions of the same user stay valid.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let jti = claims.jti.clone();
    let expires_at = claims.exp as i64;
    blocking(&state, move |db| db.revoke_token(&jti, expires_at)).await?;

    debug!("User {} logged out", claims.username);
    Ok(Json(MessageResponse {
        success: true,
        message: "Logged out successfully".into(),
    }))
}

/// Bearer tokens are immune to CSRF; the token is issued for clients that
/// still send the header.
pub async fn csrf() -> Json<CsrfResponse> {
    Json(CsrfResponse {
        csrf_token: random_token(),
    })
}

pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let Json(req) = payload?;
    let email = req.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    let lookup = email.clone();
    let Some(user) = blocking(&state, move |db| db.get_user_by_email(&lookup)).await? else {
        // Same answer whether or not the address is registered.
        return Ok(Json(ForgotPasswordResponse {
            success: true,
            message: format!(
                "If an account with {email} exists, you will receive password reset instructions."
            ),
            demo_token: None,
            demo_uid: None,
            reset_link: None,
        }));
    };

    let token = random_token();
    let token_hash = hash_reset_token(&token);
    let expires_at = state.clock.now() + state.reset_ttl.num_seconds();
    let user_id = user.id.clone();
    blocking(&state, move |db| db.insert_password_reset(&token_hash, &user_id, expires_at)).await?;

    let reset_link = format!(
        "{}/reset-password?token={}&uid={}",
        state.public_url.trim_end_matches('/'),
        token,
        user.id
    );
    info!("Password reset requested for {}", user.username);
    debug!("Reset link for {}: {}", user.username, reset_link);

    Ok(Json(ForgotPasswordResponse {
        success: true,
        message: format!("Password reset instructions sent to {email}"),
        demo_token: Some(token),
        demo_uid: Some(user.id),
        reset_link: Some(reset_link),
    }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    if req.token.is_empty() || req.uid.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::validation("Token, UID, and new password are required"));
    }
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    let uid = req.uid.clone();
    if blocking(&state, move |db| db.get_user_by_id(&uid)).await?.is_none() {
        return Err(ApiError::validation("Invalid reset link"));
    }

    let token_hash = hash_reset_token(&req.token);
    let now = state.clock.now();
    let uid = req.uid.clone();
    let new_password = req.new_password;
    let reset = blocking(&state, move |db| {
        let password_hash = hash_password(&new_password)?;
        db.complete_password_reset(&token_hash, &uid, &password_hash, now)
    })
    .await?;
    if !reset {
        return Err(ApiError::validation("Invalid or expired reset token"));
    }

    info!("Password reset completed for user {}", req.uid);
    Ok(Json(MessageResponse {
        success: true,
        message: "Password reset successfully. You can now log in with your new password.".into(),
    }))
}

/// Argon2id is CPU-bound; call it from inside `blocking`.
fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))
}

/// 32 random bytes, URL-safe base64 without padding.
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Reset tokens are stored as a sha256 digest, never in the clear.
fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn create_token(state: &AppStateInner, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        jti: Uuid::new_v4().to_string(),
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_tokens_hash_deterministically() {
        let token = random_token();
        assert_eq!(hash_reset_token(&token), hash_reset_token(&token));
        assert_eq!(hash_reset_token(&token).len(), 64);
        assert_ne!(hash_reset_token(&token), hash_reset_token(&random_token()));
    }

    #[test]
    fn random_tokens_are_url_safe() {
        let token = random_token();
        assert_eq!(token.len(), 43);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"hunter22", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"hunter23", &parsed).is_err());
    }
}
