use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use habify_types::api::Claims;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

/// Extract and validate the JWT from the Authorization header, reject
/// revoked tokens, and hand the claims to the handler as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::AuthenticationRequired)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::AuthenticationRequired
    })?;

    let jti = token_data.claims.jti.clone();
    if blocking(&state, move |db| db.is_token_revoked(&jti)).await? {
        debug!("Rejected revoked token for {}", token_data.claims.username);
        return Err(ApiError::AuthenticationRequired);
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
