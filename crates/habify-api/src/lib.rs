pub mod auth;
pub mod clock;
pub mod daylog;
pub mod error;
pub mod middleware;
pub mod profiles;
pub mod rewards;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tracing::error;

use habify_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// Every route the backend serves, with state attached.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/new/", post(auth::register))
        .route("/api/login/", post(auth::login))
        .route("/api/csrf/", get(auth::csrf))
        .route("/api/forgot-password/", post(auth::forgot_password))
        .route("/api/reset-password/", post(auth::reset_password))
        .route("/api/profile/", get(profiles::list_profiles))
        .route("/api/rewards/", get(rewards::list_rewards))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/api/logout/", post(auth::logout))
        .route("/api/daylog/", post(daylog::submit))
        .route("/api/submissions/", get(daylog::submissions))
        .route("/api/log/", get(daylog::list_log))
        .route("/api/rewards/mine/", get(rewards::my_rewards))
        .route("/buyreward/", post(rewards::buy_reward))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::from)
}
