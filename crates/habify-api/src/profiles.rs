use axum::{Json, extract::State};

use habify_types::api::ProfileEntry;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

/// GET /api/profile/: every profile. Public; visibility is the client's call.
pub async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileEntry>>, ApiError> {
    let rows = blocking(&state, |db| db.list_profiles()).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| ProfileEntry {
                id: row.id,
                user: row.username,
                streak: row.streak,
                coins: row.coins,
                avatar: row.avatar,
                last_updated: row.last_updated,
            })
            .collect(),
    ))
}
